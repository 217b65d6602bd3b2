//! Categories label expenses and scope budgets. They are shared by all users.

mod create;
mod db;
mod domain;
mod list;

pub use create::{create_category_endpoint, get_new_category_page};
pub use db::{
    create_category_table, get_all_categories, get_category, get_category_by_name,
    get_or_create_category,
};
pub use domain::{Category, CategoryName};
pub use list::get_categories_page;
