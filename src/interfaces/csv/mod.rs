pub mod catalog_reader;
pub mod order_writer;
