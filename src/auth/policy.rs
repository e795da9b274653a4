//! Route authorization table
//!
//! Each rule maps an optional method set and a path pattern to the access it
//! requires. Patterns are `/`-separated; `*` or `{name}` matches exactly one
//! segment, a trailing `**` matches any remaining segments (including none).
//! When several rules match, the most specific wins: more literal segments
//! first, then a method-restricted rule over a method-agnostic one, then
//! fewer wildcards.
//!
//! `HEAD` is looked up as `GET`, since the router answers it with the `GET`
//! handler.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, models::Role, AppState};

use super::AuthContext;

/// Access a route requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    /// Exact role match
    Role(Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Single,
    Rest,
}

#[derive(Debug, Clone)]
struct Rule {
    methods: Vec<Method>,
    segments: Vec<Segment>,
    access: Access,
}

impl Rule {
    fn new(methods: &[Method], pattern: &str, access: Access) -> Self {
        let raw: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let last = raw.len().saturating_sub(1);
        let segments = raw
            .iter()
            .enumerate()
            .map(|(i, s)| match *s {
                "**" if i == last => Segment::Rest,
                "*" | "**" => Segment::Single,
                s if s.starts_with('{') && s.ends_with('}') => Segment::Single,
                s => Segment::Literal(s.to_string()),
            })
            .collect();

        Self {
            methods: methods.to_vec(),
            segments,
            access,
        }
    }

    fn matches(&self, method: &Method, path: &[&str]) -> bool {
        if !self.methods.is_empty() && !self.methods.contains(method) {
            return false;
        }

        let mut remaining = path.iter();
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Single => {
                    if remaining.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(expected) => match remaining.next() {
                    Some(actual) if actual == expected => {}
                    _ => return false,
                },
            }
        }
        remaining.next().is_none()
    }

    fn specificity(&self) -> (usize, bool, usize, bool) {
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        let singles = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Single))
            .count();
        let open_ended = matches!(self.segments.last(), Some(Segment::Rest));
        (literals, !self.methods.is_empty(), usize::MAX - singles, !open_ended)
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    rules: Vec<Rule>,
    default: Access,
}

impl AuthorizationPolicy {
    /// Empty table; unmatched routes require `default`
    pub fn new(default: Access) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    /// Add a rule. An empty `methods` slice matches every method.
    pub fn rule(mut self, methods: &[Method], pattern: &str, access: Access) -> Self {
        self.rules.push(Rule::new(methods, pattern, access));
        self
    }

    /// Route table of the catalog service
    pub fn library() -> Self {
        Self::new(Access::Authenticated)
            .rule(&[], "/health", Access::Public)
            .rule(&[], "/ready", Access::Public)
            .rule(&[], "/swagger-ui/**", Access::Public)
            .rule(&[], "/api-docs/**", Access::Public)
            .rule(&[Method::POST], "/api/auth/register", Access::Public)
            .rule(&[Method::POST], "/api/auth/login", Access::Public)
            .rule(&[Method::GET], "/api/books/**", Access::Public)
            .rule(&[], "/api/books/**", Access::Role(Role::Admin))
            .rule(&[Method::GET], "/api/users/me", Access::Authenticated)
            .rule(&[], "/api/users/**", Access::Role(Role::Admin))
    }

    /// Access required for `method` on `path`
    pub fn required_access(&self, method: &Method, path: &str) -> Access {
        let method = if *method == Method::HEAD {
            &Method::GET
        } else {
            method
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.rules
            .iter()
            .filter(|rule| rule.matches(method, &segments))
            .max_by_key(|rule| rule.specificity())
            .map(|rule| rule.access)
            .unwrap_or(self.default)
    }

    pub fn authorize(&self, method: &Method, path: &str, context: &AuthContext) -> Result<(), AppError> {
        match self.required_access(method, path) {
            Access::Public => Ok(()),
            Access::Authenticated => context
                .principal()
                .map(|_| ())
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string())),
            Access::Role(role) => {
                let principal = context
                    .principal()
                    .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
                if context.has_authority(&role.authority()) {
                    Ok(())
                } else {
                    Err(AppError::Forbidden(format!("{} role required", role)))
                }
            }
        }
    }
}

/// Middleware enforcing the policy on the context bound by the auth filter
pub async fn authorize(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let anonymous = AuthContext::anonymous();
    let context = request.extensions().get::<AuthContext>().unwrap_or(&anonymous);

    if let Err(e) = state
        .services
        .policy
        .authorize(request.method(), request.uri().path(), context)
    {
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            "Request denied: {}",
            e
        );
        return e.into_response();
    }

    next.run(request).await
}
