pub(crate) mod context;
pub(crate) mod direct_send;
pub(crate) mod regions;
pub(crate) mod tags;
pub(crate) mod transport;
pub(crate) mod wire;
