pub mod demo;

pub use demo::{DemoAsgClient, DemoCloud, DemoDbClient, DemoIdentityBroker, DemoVmClient};
