pub mod collaborators;
pub mod controller;
pub mod event;
pub mod observer;
