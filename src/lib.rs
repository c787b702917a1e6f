pub mod watchdog {
    tonic::include_proto!("watchdog");

    /// 供 gRPC 反射服务使用的描述符集合
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("watchdog_descriptor");
}
pub mod config;
pub mod server;
pub mod services;
