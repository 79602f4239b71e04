fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile proto files for the controller API and every backend it probes:
    // - controller.proto: ControllerPrivateService (served)
    // - model/connector/pipeline/mgmt.proto: platform backends (clients)
    // - inference.proto: inference server liveness (client)
    // Servers are generated for all of them so tests can stand up fake backends.
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &[
                "proto/healthcheck.proto",
                "proto/operation.proto",
                "proto/controller.proto",
                "proto/model.proto",
                "proto/connector.proto",
                "proto/pipeline.proto",
                "proto/mgmt.proto",
                "proto/inference.proto",
            ],
            &["proto"],
        )?;
    Ok(())
}
