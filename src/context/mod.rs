//! Per-request context: the request plus typed, middleware-provided state.
//!
//! Middleware such as [`AuthMiddleware`](crate::security::AuthMiddleware)
//! stores values in the [`Extensions`] map; handlers read them back by type.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::Request;

/// Type-erased map holding at most one value per type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value of the same type.
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }
}

/// The state a handler sees for one request.
pub struct Context {
    request: Request,
    extensions: Extensions,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Decodes the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Marker(u32);

    #[test]
    fn extensions_by_type() {
        let mut ext = Extensions::new();
        assert!(ext.get::<Marker>().is_none());
        ext.insert(Marker(1));
        ext.insert(Marker(2));
        ext.insert(String::from("other"));
        assert_eq!(ext.get::<Marker>(), Some(&Marker(2)));
        assert_eq!(ext.get::<String>().map(String::as_str), Some("other"));
    }

    #[test]
    fn json_body() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\n{\"data\":1}";
        let (req, _) = Request::parse(raw).unwrap();
        let ctx = Context::new(req);
        let value: serde_json::Value = ctx.json().unwrap();
        assert_eq!(value["data"], 1);
    }
}
