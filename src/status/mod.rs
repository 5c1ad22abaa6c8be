pub mod conditions;
