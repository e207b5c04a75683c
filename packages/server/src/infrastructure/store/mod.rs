//! 外部ストア（権限ストア、ユーザーストア）のインメモリ実装
//!
//! 本番では CRUD 層が所有するデータベースを参照する実装に差し替えます。
//! 開発用サーバーとシナリオテストでは、シードファイルで初期化したこの実装を使います。

pub mod inmemory;
pub mod seed;

pub use inmemory::{InMemoryPermissionStore, InMemoryUserStore};
pub use seed::{SeedData, SeedError};
