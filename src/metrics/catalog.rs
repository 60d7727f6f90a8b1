use crate::models::Product;

impl Product {
    /// Tracked product at or below its reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        if !self.track_inventory {
            return false;
        }
        match (self.stock_quantity, self.low_stock_threshold) {
            (Some(stock), Some(threshold)) => stock <= threshold,
            _ => false,
        }
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.track_inventory && self.stock_quantity.is_some_and(|stock| stock <= 0)
    }
}
