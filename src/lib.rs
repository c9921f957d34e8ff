//! gpghigh - high-level OpenPGP file and buffer operations.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── files         # encrypt, decrypt, add/change recipient
//! │   ├── text          # sign and verify text on stdin
//! │   ├── keys          # key listing
//! │   ├── info          # identify, engine, about
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── engine/       # Engine trait and backends
//!     │   ├── gpg/      # gpg program backend
//!     │   └── memory    # in-process test backend
//!     ├── model/        # Owned key, result and validity records
//!     ├── transform/    # File jobs: encrypt, decrypt, recipient changes
//!     ├── buffer        # Sign and verify byte buffers
//!     ├── keys          # Key listing
//!     ├── info          # Engine info, file identification, about
//!     ├── naming        # Destination, temp and backup names
//!     ├── text          # Line/byte helpers
//!     └── config        # config.toml management
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gpghigh::{encrypt_file, Config, GpgEngine};
//!
//! let config = Config::load(None)?;
//! let engine = GpgEngine::from_config(&config.engine);
//! let out = encrypt_file(&engine, "notes.txt".as_ref(), None, &["alice@example.com"], false)?;
//! println!("{}", out.display());
//! # Ok::<(), gpghigh::error::Error>(())
//! ```

pub mod cli;
pub mod core;
pub mod error;

pub use crate::core::buffer::{sign_bytes, verify_bytes, SignedBytes, VerifiedBytes};
pub use crate::core::config::Config;
pub use crate::core::engine::{EncryptFlags, Engine, GpgEngine, MemoryEngine};
pub use crate::core::info::{about, engine_info, identify_file};
pub use crate::core::keys::key_list;
pub use crate::core::transform::{decrypt_file, encrypt_file, modify_recipients};
pub use crate::error::{Error, Result};
