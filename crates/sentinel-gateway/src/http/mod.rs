pub mod error;
pub mod events;
pub mod health;
pub mod pair;
pub mod tenants;

#[cfg(test)]
pub(crate) mod testing;
