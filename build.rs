use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 若环境中未提供 protoc，则使用 vendored 版本
    if env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()?;
        // SAFETY: build 脚本为单线程，此时尚无其他线程读取环境变量
        unsafe { env::set_var("PROTOC", protoc) };
    }
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    tonic_prost_build::configure()
        .file_descriptor_set_path(out_dir.join("watchdog_descriptor.bin"))
        .compile_protos(&["proto/watchdog.proto"], &["proto"])?;
    Ok(())
}
