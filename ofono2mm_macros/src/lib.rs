// This file is part of ofono2mm, a daemon that exposes oFono managed modems through the ModemManager D-Bus API.
//
// Copyright 2025 The ofono2mm Authors.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// ofono2mm is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// ofono2mm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Procedural macros for ofono2mm.
//!
//! `#[derive(StateDiff)]` generates the field-by-field comparison used to publish only the
//! properties of a snapshot that actually changed. The generated impl targets
//! `crate::modem::snapshot::StateDiff`, so the derive is only usable inside the ofono2mm crate.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Derive `changed_fields(&self, previous: &Self) -> Vec<&'static str>` for a struct with named
/// fields. Every field must implement `PartialEq`.
#[proc_macro_derive(StateDiff)]
pub fn derive_state_diff(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(
                    name,
                    "StateDiff can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(name, "StateDiff can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut comparisons = Vec::new();
    for field in fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        let label = ident.to_string();
        comparisons.push(quote! {
            if self.#ident != previous.#ident {
                changed.push(#label);
            }
        });
    }

    let expanded = quote! {
        impl #impl_generics crate::modem::snapshot::StateDiff for #name #ty_generics #where_clause {
            fn changed_fields(&self, previous: &Self) -> ::std::vec::Vec<&'static str> {
                let mut changed = ::std::vec::Vec::new();
                #(#comparisons)*
                changed
            }
        }
    };
    expanded.into()
}
