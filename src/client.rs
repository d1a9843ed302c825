//! HTTP client for a PostgREST transaction table (as served by Supabase).
//!
//! Provides both async and blocking client variants behind feature flags.
//! Both implement the matching remote store trait from [`crate::remote`].

use url::Url;
use url::form_urlencoded;

use crate::error::Result;
use crate::models::{Filter, OrderBy, Transaction};

/// Path prefix of the PostgREST API under the project URL.
const REST_PATH: &str = "rest/v1";

/// Table queried when none is configured.
const DEFAULT_TABLE: &str = "transactions";

/// Header carrying the project API key.
const API_KEY_HEADER: &str = "apikey";

/// Header asking PostgREST to return affected rows.
const PREFER_HEADER: &str = "Prefer";

/// Value of [`PREFER_HEADER`] on writes.
const RETURN_REPRESENTATION: &str = "return=representation";

/// Resolves `{base}/rest/v1/{table}`, keeping any path already on `base`.
fn table_url(base: &str, table: &str) -> Result<Url> {
    let mut root = Url::parse(base)?;
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    Ok(root.join(&format!("{REST_PATH}/{table}"))?)
}

/// Renders the PostgREST query string for `filter` and optional `order`.
fn query_string(filter: &Filter, order: Option<OrderBy>) -> String {
    let mut pairs: Vec<(&str, String)> = vec![("select", "*".to_owned())];
    if let Some(user) = filter.user_id.as_ref() {
        pairs.push(("user_id", format!("eq.{user}")));
    }
    if let Some(id) = filter.id {
        pairs.push(("id", format!("eq.{id}")));
    }
    if let Some(order) = order {
        pairs.push(("order", order.to_query_value()));
    }
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Decodes a row array one row at a time, skipping rows that do not form
/// a transaction so the rest of the set survives.
fn decode_rows(body: &str) -> Result<Vec<Transaction>> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(body)?;
    let total = raw.len();
    let rows: Vec<Transaction> = raw
        .into_iter()
        .filter_map(|value| {
            serde_json::from_value::<Transaction>(value)
                .inspect_err(|err| tracing::warn!(error = %err, "skipping undecodable row"))
                .ok()
        })
        .collect();
    if rows.len() < total {
        tracing::warn!(skipped = total - rows.len(), total, "dropped malformed rows");
    }
    Ok(rows)
}

/// Row body sent on insert: the draft plus its owner.
#[derive(Debug, serde::Serialize)]
struct InsertRow<'row> {
    /// Owner of the new row.
    user_id: &'row crate::models::UserId,
    /// Caller-supplied fields.
    #[serde(flatten)]
    draft: &'row crate::models::TransactionDraft,
}

/// Generates a REST client (async or blocking) with builder, store
/// implementation, and tests.
macro_rules! define_client {
    (
        client_name: $client:ident,
        builder_name: $builder:ident,
        http_type: $http_type:ty,
        request_type: $req_type:ty,
        response_type: $resp_type:ty,
        store_trait: $store_trait:path,
        client_doc: $client_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder {
            /// Project URL, e.g. `https://xyz.supabase.co`.
            base_url: Option<String>,
            /// Project API key (the public "anon" key).
            api_key: Option<SecretString>,
            /// Signed-in user's JWT, sent instead of the API key as bearer.
            access_token: Option<SecretString>,
            /// Table name override.
            table: Option<String>,
        }

        impl $builder {
            /// Sets the project URL.
            #[inline]
            #[must_use]
            pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
                self.base_url = Some(url.into());
                self
            }

            /// Sets the project API key.
            #[inline]
            #[must_use]
            pub fn api_key<T: Into<String>>(mut self, key: T) -> Self {
                self.api_key = Some(SecretString::from(key.into()));
                self
            }

            /// Sets the signed-in user's access token.
            #[inline]
            #[must_use]
            pub fn access_token<T: Into<String>>(mut self, token: T) -> Self {
                self.access_token = Some(SecretString::from(token.into()));
                self
            }

            /// Overrides the table name (default `transactions`).
            #[inline]
            #[must_use]
            pub fn table<T: Into<String>>(mut self, table: T) -> Self {
                self.table = Some(table.into());
                self
            }

            /// Builds the client.
            ///
            /// # Errors
            ///
            /// Returns [`FinTrackError::MissingCredentials`] if no API key was provided.
            /// Returns [`FinTrackError::MissingConfig`] if no base URL was provided or
            /// the table name is empty.
            /// Returns [`FinTrackError::InvalidUrl`] if the base URL does not parse.
            /// Returns [`FinTrackError::Http`] if the HTTP client fails to build.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub fn build(self) -> Result<$client> {
                let api_key = self.api_key.ok_or(FinTrackError::MissingCredentials)?;
                let base_url = self
                    .base_url
                    .ok_or(FinTrackError::MissingConfig { field: "base_url" })?;
                let table = self.table.unwrap_or_else(|| DEFAULT_TABLE.to_owned());
                if table.trim().is_empty() {
                    return Err(FinTrackError::MissingConfig { field: "table" });
                }
                let endpoint = table_url(&base_url, &table)?;
                tracing::debug!(endpoint = %endpoint, "building client");
                let http = <$http_type>::builder().build()?;

                Ok($client {
                    http,
                    endpoint,
                    api_key,
                    access_token: self.access_token,
                })
            }
        }

        #[doc = $client_doc]
        #[derive(Debug)]
        pub struct $client {
            /// Underlying HTTP client.
            http: $http_type,
            /// Fully resolved table URL.
            endpoint: Url,
            /// Project API key.
            api_key: SecretString,
            /// Optional user access token.
            access_token: Option<SecretString>,
        }

        impl $client {
            /// Creates a new builder for configuring the client.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder {
                $builder {
                    base_url: None,
                    api_key: None,
                    access_token: None,
                    table: None,
                }
            }

            /// Returns the resolved table URL.
            #[inline]
            #[must_use]
            pub const fn endpoint(&self) -> &Url {
                &self.endpoint
            }

            /// Returns the bearer credential: the access token when set,
            /// otherwise the API key.
            fn bearer(&self) -> &str {
                self.access_token
                    .as_ref()
                    .unwrap_or(&self.api_key)
                    .expose_secret()
            }

            /// Starts an authenticated request against the table.
            fn request(&self, method: Method, query: &str) -> $req_type {
                let mut url = self.endpoint.clone();
                url.set_query(Some(query));
                tracing::trace!(method = %method, url = %url, "sending request");
                self.http
                    .request(method, url)
                    .header(API_KEY_HEADER, self.api_key.expose_secret())
                    .header(AUTHORIZATION, format!("Bearer {}", self.bearer()))
            }

            /// Decodes a row array, mapping non-success statuses to
            /// [`FinTrackError::Api`].
            $($async_kw)? fn read_rows(response: $resp_type) -> Result<Vec<Transaction>> {
                let status = response.status();
                tracing::debug!(status = %status, "received response");
                if status.is_success() {
                    let body = response.text() $( .$await_ext )? ?;
                    tracing::trace!(body_len = body.len(), "parsing response body");
                    decode_rows(&body)
                } else {
                    let message = response
                        .text()
                        $( .$await_ext )?
                        .unwrap_or_else(|_| "unknown error".to_owned());
                    tracing::debug!(status = status.as_u16(), message = %message, "API error");
                    Err(FinTrackError::Api {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
        }

        impl $store_trait for $client {
            #[inline]
            #[tracing::instrument(skip_all, fields(order = %order.to_query_value()))]
            $($async_kw)? fn select(
                &self,
                filter: &Filter,
                order: OrderBy,
            ) -> Result<Vec<Transaction>> {
                let response = self
                    .request(Method::GET, &query_string(filter, Some(order)))
                    .send()
                    $( .$await_ext )?
                    ?;
                Self::read_rows(response) $( .$await_ext )?
            }

            #[inline]
            #[tracing::instrument(skip_all, fields(user = %user))]
            $($async_kw)? fn insert(
                &self,
                user: &UserId,
                draft: &TransactionDraft,
            ) -> Result<Transaction> {
                let row = InsertRow { user_id: user, draft };
                let response = self
                    .request(Method::POST, &query_string(&Filter::new(), None))
                    .header(PREFER_HEADER, RETURN_REPRESENTATION)
                    .header(CONTENT_TYPE, "application/json")
                    .json(&row)
                    .send()
                    $( .$await_ext )?
                    ?;
                Self::read_rows(response)
                    $( .$await_ext )?
                    ?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        FinTrackError::Unavailable("insert returned no row".to_owned())
                    })
            }

            #[inline]
            #[tracing::instrument(skip_all, fields(id = ?filter.id))]
            $($async_kw)? fn update(
                &self,
                filter: &Filter,
                patch: &TransactionPatch,
            ) -> Result<Transaction> {
                let id = target_id(filter)?;
                let response = self
                    .request(Method::PATCH, &query_string(filter, None))
                    .header(PREFER_HEADER, RETURN_REPRESENTATION)
                    .header(CONTENT_TYPE, "application/json")
                    .json(patch)
                    .send()
                    $( .$await_ext )?
                    ?;
                Self::read_rows(response)
                    $( .$await_ext )?
                    ?
                    .into_iter()
                    .next()
                    .ok_or(FinTrackError::NotFound { id })
            }

            #[inline]
            #[tracing::instrument(skip_all, fields(id = ?filter.id))]
            $($async_kw)? fn delete(&self, filter: &Filter) -> Result<()> {
                let id = target_id(filter)?;
                let response = self
                    .request(Method::DELETE, &query_string(filter, None))
                    .header(PREFER_HEADER, RETURN_REPRESENTATION)
                    .send()
                    $( .$await_ext )?
                    ?;
                let deleted = Self::read_rows(response) $( .$await_ext )? ?;
                if deleted.is_empty() {
                    return Err(FinTrackError::NotFound { id });
                }
                tracing::debug!(count = deleted.len(), "rows deleted");
                Ok(())
            }
        }

        #[cfg(test)]
        mod tests {
            use super::*;

            #[test]
            fn builder_requires_api_key() {
                let err = $client::builder()
                    .base_url("http://localhost:54321")
                    .build()
                    .unwrap_err();
                assert!(matches!(err, FinTrackError::MissingCredentials));
            }

            #[test]
            fn builder_requires_base_url() {
                let err = $client::builder().api_key("anon").build().unwrap_err();
                assert!(matches!(
                    err,
                    FinTrackError::MissingConfig { field: "base_url" }
                ));
            }

            #[test]
            fn builder_rejects_malformed_url() {
                let err = $client::builder()
                    .base_url("not a url")
                    .api_key("anon")
                    .build()
                    .unwrap_err();
                assert!(matches!(err, FinTrackError::InvalidUrl(_)));
            }

            #[test]
            fn builder_rejects_empty_table() {
                let err = $client::builder()
                    .base_url("http://localhost:54321")
                    .api_key("anon")
                    .table(" ")
                    .build()
                    .unwrap_err();
                assert!(matches!(err, FinTrackError::MissingConfig { field: "table" }));
            }

            #[test]
            fn builder_resolves_default_endpoint() {
                let client = $client::builder()
                    .base_url("http://localhost:54321")
                    .api_key("anon")
                    .build()
                    .unwrap();
                assert_eq!(
                    client.endpoint().as_str(),
                    "http://localhost:54321/rest/v1/transactions"
                );
                assert_eq!(client.bearer(), "anon");
            }

            #[test]
            fn builder_custom_table_and_token() {
                let client = $client::builder()
                    .base_url("https://example.supabase.co/proxy")
                    .api_key("anon")
                    .access_token("jwt")
                    .table("ledger")
                    .build()
                    .unwrap();
                assert_eq!(
                    client.endpoint().as_str(),
                    "https://example.supabase.co/proxy/rest/v1/ledger"
                );
                assert_eq!(client.bearer(), "jwt");
            }
        }
    };
}

#[cfg(feature = "async")]
mod async_client {
    //! Async REST client.

    use reqwest::Method;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
    use secrecy::{ExposeSecret, SecretString};
    use url::Url;

    use super::{
        API_KEY_HEADER, DEFAULT_TABLE, InsertRow, PREFER_HEADER, RETURN_REPRESENTATION,
        decode_rows, query_string, table_url,
    };
    use crate::error::{FinTrackError, Result};
    use crate::models::{Filter, OrderBy, Transaction, TransactionDraft, TransactionPatch, UserId};
    use crate::remote::target_id;

    define_client! {
        client_name: RestClient,
        builder_name: RestClientBuilder,
        http_type: reqwest::Client,
        request_type: reqwest::RequestBuilder,
        response_type: reqwest::Response,
        store_trait: crate::remote::RemoteStore,
        client_doc: "Async client for a PostgREST transaction table.\n\nUse [`RestClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`RestClient`].",
        async_kw: async,
        await_kw: await,
    }
}

#[cfg(feature = "blocking")]
mod blocking_client {
    //! Blocking (synchronous) REST client.

    use reqwest::Method;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
    use secrecy::{ExposeSecret, SecretString};
    use url::Url;

    use super::{
        API_KEY_HEADER, DEFAULT_TABLE, InsertRow, PREFER_HEADER, RETURN_REPRESENTATION,
        decode_rows, query_string, table_url,
    };
    use crate::error::{FinTrackError, Result};
    use crate::models::{Filter, OrderBy, Transaction, TransactionDraft, TransactionPatch, UserId};
    use crate::remote::target_id;

    define_client! {
        client_name: RestBlockingClient,
        builder_name: RestBlockingClientBuilder,
        http_type: reqwest::blocking::Client,
        request_type: reqwest::blocking::RequestBuilder,
        response_type: reqwest::blocking::Response,
        store_trait: crate::remote::BlockingRemoteStore,
        client_doc: "Blocking (synchronous) client for a PostgREST transaction table.\n\nUse [`RestBlockingClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`RestBlockingClient`].",
    }
}

#[cfg(feature = "async")]
pub use async_client::{RestClient, RestClientBuilder};
#[cfg(feature = "blocking")]
pub use blocking_client::{RestBlockingClient, RestBlockingClientBuilder};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FinTrackError;
    use crate::models::{Currency, OrderColumn, TransactionId, UserId};

    #[test]
    fn decode_rows_skips_rows_without_id() {
        let body = r#"[
            {"id": 1, "title": "Rent", "type": "expense", "amount": 900},
            {"title": "orphan", "type": "expense"},
            {"id": 2, "title": null, "type": "expense", "currency": null}
        ]"#;
        let rows = decode_rows(body).unwrap();
        let ids: Vec<i64> = rows.iter().map(|tx| tx.id.into_inner()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(rows.get(1).unwrap().currency, Currency::Inr);
    }

    #[test]
    fn decode_rows_rejects_non_array_body() {
        assert!(matches!(
            decode_rows(r#"{"message": "oops"}"#),
            Err(FinTrackError::Serialization(_))
        ));
    }

    #[test]
    fn query_string_for_select() {
        let filter = Filter::new().user(UserId::new("u-1"));
        assert_eq!(
            query_string(&filter, Some(OrderBy::id_desc())),
            "select=*&user_id=eq.u-1&order=id.desc"
        );
    }

    #[test]
    fn query_string_for_mutation() {
        let filter = Filter::new()
            .user(UserId::new("u 1"))
            .id(TransactionId::new(7));
        assert_eq!(
            query_string(&filter, None),
            "select=*&user_id=eq.u+1&id=eq.7"
        );
    }

    #[test]
    fn query_string_orders_by_date() {
        let order = OrderBy {
            column: OrderColumn::Date,
            ascending: true,
        };
        assert_eq!(
            query_string(&Filter::new(), Some(order)),
            "select=*&order=date.asc"
        );
    }

    #[test]
    fn table_url_keeps_base_path() {
        assert_eq!(
            table_url("http://127.0.0.1:8080", "transactions")
                .unwrap()
                .as_str(),
            "http://127.0.0.1:8080/rest/v1/transactions"
        );
        assert_eq!(
            table_url("http://127.0.0.1:8080/base/", "t").unwrap().as_str(),
            "http://127.0.0.1:8080/base/rest/v1/t"
        );
    }
}
