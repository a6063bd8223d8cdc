pub mod boost_state;
pub mod cluster;
pub mod coordinator;
pub mod deadline;
pub mod driver;
pub mod hints;
pub mod policy;
pub mod timer;
pub mod tunables;
