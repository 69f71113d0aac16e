// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Entry Point
//!
//! Properties of the artifact store boundary that must hold for every
//! document, not just the fixtures.

mod property;
