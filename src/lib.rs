pub mod catalog;
pub mod elements;
pub mod events;
pub mod predict;
pub mod tracker;
pub mod web;
