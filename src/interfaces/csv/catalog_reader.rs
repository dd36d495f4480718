use crate::domain::item::ProductSnapshot;
use crate::error::{OrderError, Result};
use std::io::Read;

/// Reads catalog products (`id,name,sku,image_url`) from a CSV source.
///
/// Whitespace is trimmed and an empty `image_url` reads as `None`.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes products, one `Result` per record.
    pub fn products(self) -> impl Iterator<Item = Result<ProductSnapshot>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(OrderError::from))
    }
}
