// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod audit;
pub mod cfg;
pub mod chaos;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod model;
pub mod observability;
pub mod processor;
pub mod probe;
pub mod retry;
pub mod route;
pub mod screen;
pub mod server;
pub mod translate;
pub mod wire;
pub mod workflow;
