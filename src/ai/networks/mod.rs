mod policy_network;

pub use policy_network::{NetworkArchitecture, PolicyNetwork, PolicyNetworkConfig};
