pub mod api_adapter;
pub mod tcp_probe;
