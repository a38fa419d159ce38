//! Compiles the remote cache protocol into Rust message types, a gRPC
//! service trait for the server and a client stub.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/ordered_cache.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/ordered_cache.proto");

    Ok(())
}
