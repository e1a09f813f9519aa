pub mod design;
pub mod discount;
pub mod order;
pub mod order_counter;
pub mod order_item;
pub mod product;
pub mod product_template;
pub mod store_settings;
