fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().compile(&["proto/append_log.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto");

    Ok(())
}
