// Uses protox (pure Rust protobuf compiler) to avoid requiring an external
// protoc binary.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // protox doesn't emit rerun directives automatically.
    println!("cargo:rerun-if-changed=proto/relay.proto");

    let file_descriptors = protox::compile(["proto/relay.proto"], ["proto"])?;
    tonic_prost_build::configure()
        .build_client(false)
        .compile_fds(file_descriptors)?;

    Ok(())
}
