// =============================================================================
// Pulse - Kernel Library
// =============================================================================
// Board table and the periodic tick subsystem. Hardware-independent, so it
// builds and tests on the host; `main.rs` wires it to the real registers.
//
// SPDX-License-Identifier: GPL-2.0
// Copyright (c) 2025 APRK
// =============================================================================

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod tick;
