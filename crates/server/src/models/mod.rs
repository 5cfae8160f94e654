//! Domain models for the store.

pub mod cart;
pub mod favourites;
pub mod product;
pub mod user;

pub use cart::{Cart, CartError, CartLine};
pub use favourites::Favourites;
pub use product::{Category, NewProduct, Product, ProductFilter, ProductPatch};
pub use user::{Address, NewUser, Profile, User};
