pub mod cache_dir;
pub mod reconcile;

pub use cache_dir::list_package_files;
pub use reconcile::reconcile;
