pub mod private_key;
pub mod rpc_url;

pub use private_key::PrivateKey;
pub use rpc_url::RpcUrl;
