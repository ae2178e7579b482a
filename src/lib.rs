//! EduPrint
//!
//! Storefront core for a print and stationery shop: catalog, cart, checkout, order history,
//! invoices and free template downloads with format conversion. State lives in memory or in
//! local JSON files.

pub mod audit;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod conversion;
pub mod invoice;
pub mod notify;
pub mod orders;
pub mod pricing;
pub mod session;
pub mod storage;
pub mod tables;
