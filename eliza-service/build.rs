use prost::Message;
use std::env::var;
use std::io::Result;
use std::path::Path;

fn main() -> Result<()> {
    // List of proto files containing a message definition
    let proto_files = &[
        // Services
        "proto/connectrpc/eliza/v1/eliza.proto",
        "proto/pagination/v1/list.proto",
        // Messages only
        "proto/test/v1/kitchen_sink.proto",
        "proto/test/v1/legacy.proto",
    ];

    // Name of the folder containing the proto definitions
    let proto_folder = "proto";
    let out_dir = var("OUT_DIR").expect("Missing OUT_DIR environment variable");
    let descriptors_path = Path::new(&out_dir).join("descriptors.bin");

    // protox parses the files in-process, so no `protoc` install is needed.
    let fds = protox::compile(proto_files, [proto_folder]).unwrap();
    std::fs::write(descriptors_path, fds.encode_to_vec())?;

    for file in proto_files {
        println!("cargo:rerun-if-changed={file}");
    }

    tonic_prost_build::configure()
        .build_client(false)
        .compile_fds(fds)
}
