pub mod embedding_adapter;
