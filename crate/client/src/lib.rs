pub use config::{KMIP_CONF_ENV, KmipClientConfig};
pub use error::{
    ClientError,
    result::{ClientResult, ClientResultHelper},
};
pub use kmip_client::{
    EncryptResult, IndeterminateOperation, KmipClient, KmipClientOptions, into_payload,
};
pub use kmip_proto;
pub use lifecycle::{KeyUse, LifecycleEvent, ObjectStateTable, ObjectView, next_state};
pub use socket_transport::SocketTransport;
pub use transport::{KmipTransport, TransportError};

mod config;
mod error;
mod kmip_client;
mod lifecycle;
mod socket_transport;
mod transport;
