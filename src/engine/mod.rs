//! The engine turns block batches into stored log records: the receipt
//! filter, the record mapper, the batch processor and the pipeline driver
//! that runs them in a loop.

pub mod batch_processor;
pub mod filtering;
pub mod pipeline;
pub mod record_mapper;
