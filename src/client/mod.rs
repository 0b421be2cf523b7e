pub mod embedder_client;
