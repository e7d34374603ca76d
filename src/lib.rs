// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Closeable FIFO/broadcast channels for threads in one process.
// A channel layers a one-way closed flag over an ordered broadcast log so
// that readers detect end of stream without racing writers or the close.

pub mod config;
pub use config::{Config, ConfigError};

pub mod waiter;
pub use waiter::{Step, Waiter};

mod queue;

pub mod channel;
pub use channel::{BroadcastChannel, Channel, Iter, TryIter, TryRead};
