// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of SmartWatt.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! SmartWatt shared types
//!
//! Plain data exchanged between the analytics engine and its collaborators
//! (ingestion, persistence, UI). Nothing in this crate performs I/O.

pub mod alert;
pub mod prediction;
pub mod reading;
pub mod tariff;

pub use alert::*;
pub use prediction::*;
pub use reading::*;
pub use tariff::*;

/// Identifier of a dashboard user (owner of a meter)
pub type UserId = u64;
