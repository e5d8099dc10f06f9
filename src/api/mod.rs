//! Authenticated client for the finance tracker REST backend.

mod envelope;
mod resource;
mod transport;

pub use envelope::{Page, Pagination};
pub use resource::{DashboardSection, ListQuery, ReportKind, Resource};
pub use transport::{HttpRequest, HttpResponse, Method, Transport, UreqTransport};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{ApiSettings, Session};
use crate::error::{Result, TrackerError};
use crate::models::{AuthPayload, LoginRequest, Profile, RegisterRequest, User};
use envelope::{DataEnvelope, ErrorBody, ListEnvelope};

/// Request body with the active profile id merged in
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Scoped<'a, B: Serialize> {
    profile_id: &'a str,
    #[serde(flatten)]
    body: &'a B,
}

pub struct ApiClient<T: Transport = UreqTransport> {
    base_url: String,
    transport: T,
    session: Session,
}

impl ApiClient<UreqTransport> {
    pub fn from_settings(settings: &ApiSettings, session: Session) -> Self {
        let transport = UreqTransport::new(Duration::from_secs(settings.timeout_secs));
        Self::new(&settings.base_url, transport, session)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(base_url: &str, transport: T, session: Session) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    fn profile_id(&self) -> Result<String> {
        self.session.profile_id().map(str::to_string)
    }

    /// Send one request and return the body of a 2xx response.
    ///
    /// A 401 outside the login/registration endpoints tears the session
    /// down before reporting [`TrackerError::Unauthorized`].
    fn send(
        &mut self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<String>,
    ) -> Result<String> {
        let request = HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            query,
            bearer: self.session.token().map(str::to_string),
            body,
        };

        debug!(%method, path, "sending request");
        let response = self.transport.execute(&request)?;
        debug!(%method, path, status = response.status, "received response");

        let is_auth_endpoint = path == "/auth/login" || path == "/auth/register";
        if response.status == 401 && !is_auth_endpoint {
            warn!(path, "server rejected credentials, clearing session");
            self.session.teardown()?;
            return Err(TrackerError::Unauthorized);
        }

        if response.status >= 400 {
            let message = serde_json::from_str::<ErrorBody>(&response.body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("Request failed with status {}", response.status));
            return Err(TrackerError::Api {
                status: response.status,
                message,
            });
        }

        Ok(response.body)
    }

    fn send_json<B: Serialize>(
        &mut self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: &B,
    ) -> Result<String> {
        let body = serde_json::to_string(body).map_err(TrackerError::Decode)?;
        self.send(method, path, query, Some(body))
    }

    fn decode<R: DeserializeOwned>(body: &str) -> Result<R> {
        let envelope: DataEnvelope<R> = serde_json::from_str(body).map_err(TrackerError::Decode)?;
        Ok(envelope.data)
    }

    fn scoped_query(&self) -> Result<Vec<(String, String)>> {
        Ok(vec![("profileId".to_string(), self.profile_id()?)])
    }

    fn item_path(resource: Resource, id: &str) -> String {
        format!("{}/{}", resource.path(), id)
    }

    // Generic CRUD

    pub fn list<R: DeserializeOwned>(&mut self, resource: Resource, query: &ListQuery) -> Result<Page<R>> {
        let pairs = query.to_pairs(&self.profile_id()?);
        let body = self.send(Method::Get, resource.path(), pairs, None)?;
        let envelope: ListEnvelope<R> = serde_json::from_str(&body).map_err(TrackerError::Decode)?;
        Ok(envelope.into())
    }

    pub fn get<R: DeserializeOwned>(&mut self, resource: Resource, id: &str) -> Result<R> {
        let query = self.scoped_query()?;
        let body = self.send(Method::Get, &Self::item_path(resource, id), query, None)?;
        Self::decode(&body)
    }

    pub fn create<B: Serialize, R: DeserializeOwned>(&mut self, resource: Resource, body: &B) -> Result<R> {
        let profile_id = self.profile_id()?;
        let scoped = Scoped {
            profile_id: &profile_id,
            body,
        };
        let body = self.send_json(Method::Post, resource.path(), Vec::new(), &scoped)?;
        Self::decode(&body)
    }

    pub fn update<B: Serialize, R: DeserializeOwned>(
        &mut self,
        resource: Resource,
        id: &str,
        body: &B,
    ) -> Result<R> {
        let profile_id = self.profile_id()?;
        let scoped = Scoped {
            profile_id: &profile_id,
            body,
        };
        let path = Self::item_path(resource, id);
        let body = self.send_json(Method::Put, &path, Vec::new(), &scoped)?;
        Self::decode(&body)
    }

    pub fn delete(&mut self, resource: Resource, id: &str) -> Result<()> {
        let query = self.scoped_query()?;
        self.send(Method::Delete, &Self::item_path(resource, id), query, None)?;
        Ok(())
    }

    pub fn stats(&mut self, resource: Resource) -> Result<Value> {
        if !resource.has_stats() {
            return Err(TrackerError::Unsupported(resource.label().to_string()));
        }
        let query = self.scoped_query()?;
        let path = format!("{}/stats", resource.path());
        let body = self.send(Method::Get, &path, query, None)?;
        Self::decode(&body)
    }

    // Auth and profiles

    pub fn login(&mut self, request: &LoginRequest) -> Result<&User> {
        let body = self.send_json(Method::Post, "/auth/login", Vec::new(), request)?;
        self.establish(&body)
    }

    pub fn register(&mut self, request: &RegisterRequest) -> Result<&User> {
        let body = self.send_json(Method::Post, "/auth/register", Vec::new(), request)?;
        self.establish(&body)
    }

    fn establish(&mut self, body: &str) -> Result<&User> {
        let payload: AuthPayload = Self::decode(body)?;
        self.session.establish(payload);
        self.session.persist()?;
        self.session.user().ok_or(TrackerError::NotLoggedIn)
    }

    /// Tell the server, then clear the local session whatever it answered
    pub fn logout(&mut self) -> Result<()> {
        if self.session.is_authenticated() {
            if let Err(e) = self.send(Method::Post, "/auth/logout", Vec::new(), None) {
                warn!(error = %e, "logout request failed");
            }
        }
        self.session.teardown()
    }

    /// Fetch the signed-in user and refresh the stored copy
    pub fn current_user(&mut self) -> Result<User> {
        if !self.session.is_authenticated() {
            return Err(TrackerError::NotLoggedIn);
        }
        let body = self.send(Method::Get, "/auth/profile", Vec::new(), None)?;
        let user: User = Self::decode(&body)?;
        self.session.set_user(user.clone());
        self.session.persist()?;
        Ok(user)
    }

    pub fn profiles(&mut self) -> Result<Vec<Profile>> {
        if !self.session.is_authenticated() {
            return Err(TrackerError::NotLoggedIn);
        }
        let body = self.send(Method::Get, "/profiles", Vec::new(), None)?;
        let envelope: ListEnvelope<Profile> =
            serde_json::from_str(&body).map_err(TrackerError::Decode)?;
        Ok(envelope.data)
    }

    pub fn switch_profile(&mut self, profile_id: &str) -> Result<Profile> {
        let profile = self
            .profiles()?
            .into_iter()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| TrackerError::ProfileNotFound(profile_id.to_string()))?;

        self.send_json(
            Method::Post,
            "/profiles/switch",
            Vec::new(),
            &json!({ "profileId": profile_id }),
        )?;
        self.session.switch_profile(profile.clone());
        self.session.persist()?;
        Ok(profile)
    }

    // Entity-specific actions

    pub fn approve_expense(&mut self, id: &str) -> Result<Value> {
        let query = self.scoped_query()?;
        let path = format!("{}/approve", Self::item_path(Resource::Expenses, id));
        let body = self.send_json(Method::Post, &path, query, &json!({}))?;
        Self::decode(&body)
    }

    pub fn reject_expense(&mut self, id: &str, reason: &str) -> Result<Value> {
        let query = self.scoped_query()?;
        let path = format!("{}/reject", Self::item_path(Resource::Expenses, id));
        let body = self.send_json(
            Method::Post,
            &path,
            query,
            &json!({ "rejectionReason": reason }),
        )?;
        Self::decode(&body)
    }

    pub fn budget_performance(&mut self, id: &str) -> Result<Value> {
        let query = self.scoped_query()?;
        let path = format!("{}/performance", Self::item_path(Resource::Budgets, id));
        let body = self.send(Method::Get, &path, query, None)?;
        Self::decode(&body)
    }

    pub fn account_balance(&mut self, id: &str) -> Result<Value> {
        let query = self.scoped_query()?;
        let path = format!("{}/balance", Self::item_path(Resource::BankAccounts, id));
        let body = self.send(Method::Get, &path, query, None)?;
        Self::decode(&body)
    }

    pub fn category_tree(&mut self, kind: Option<&str>) -> Result<Value> {
        let mut query = self.scoped_query()?;
        if let Some(kind) = kind {
            query.push(("type".to_string(), kind.to_string()));
        }
        let body = self.send(Method::Get, "/categories/tree", query, None)?;
        Self::decode(&body)
    }

    // Dashboard and reports

    pub fn dashboard(&mut self, section: DashboardSection, period: &str) -> Result<Value> {
        let mut query = self.scoped_query()?;
        query.push(("period".to_string(), period.to_string()));
        let body = self.send(Method::Get, section.path(), query, None)?;
        Self::decode(&body)
    }

    pub fn report(&mut self, kind: ReportKind, from: Option<&str>, to: Option<&str>) -> Result<Value> {
        let mut query = self.scoped_query()?;
        if let Some(from) = from {
            query.push(("startDate".to_string(), from.to_string()));
        }
        if let Some(to) = to {
            query.push(("endDate".to_string(), to.to_string()));
        }
        let body = self.send(Method::Get, kind.path(), query, None)?;
        Self::decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Invoice, Record, VendorInput};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned responses and records what was sent
    #[derive(Default)]
    struct FakeTransport {
        responses: RefCell<VecDeque<HttpResponse>>,
        sent: RefCell<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn replying(responses: &[(u16, Value)]) -> Self {
            let fake = Self::default();
            for (status, body) in responses {
                fake.responses.borrow_mut().push_back(HttpResponse {
                    status: *status,
                    body: body.to_string(),
                });
            }
            fake
        }

        fn last(&self) -> HttpRequest {
            self.sent.borrow().last().cloned().unwrap()
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.sent.borrow_mut().push(request.clone());
            Ok(self.responses.borrow_mut().pop_front().unwrap())
        }
    }

    fn signed_in() -> Session {
        let profile = Profile {
            id: "p1".to_string(),
            profile_name: "Studio".to_string(),
            currency: None,
            currency_symbol: None,
        };
        Session::ephemeral(Some("tok".to_string()), Some(profile))
    }

    fn client(responses: &[(u16, Value)]) -> ApiClient<FakeTransport> {
        ApiClient::new(
            "http://api.test/api/v1/",
            FakeTransport::replying(responses),
            signed_in(),
        )
    }

    #[test]
    fn test_list_sends_profile_and_bearer() {
        let mut api = client(&[(
            200,
            json!({
                "data": [{ "id": 1, "vendorType": "company", "companyName": "Paper Co" }],
                "pagination": {
                    "currentPage": 1, "totalPages": 3, "totalItems": 21,
                    "hasNextPage": true, "hasPrevPage": false
                }
            }),
        )]);

        let query = ListQuery {
            page: Some(1),
            ..ListQuery::default()
        };
        let page: Page<Record<VendorInput>> = api.list(Resource::Vendors, &query).unwrap();

        assert_eq!(page.items[0].fields.contact.company_name, "Paper Co");
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_next_page);

        let sent = api.transport().last();
        assert_eq!(sent.method, Method::Get);
        assert_eq!(sent.url, "http://api.test/api/v1/vendors");
        assert_eq!(sent.bearer.as_deref(), Some("tok"));
        assert!(sent.query.contains(&("profileId".to_string(), "p1".to_string())));
    }

    #[test]
    fn test_create_merges_profile_id() {
        let mut api = client(&[(201, json!({ "data": { "id": "inv-1", "invoiceNumber": "INV-202503-0001" } }))]);

        let created: Invoice = api
            .create(Resource::Invoices, &json!({ "invoiceNumber": "INV-202503-0001" }))
            .unwrap();
        assert_eq!(created.id, "inv-1");

        let sent = api.transport().last();
        assert_eq!(sent.method, Method::Post);
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["profileId"], "p1");
        assert_eq!(body["invoiceNumber"], "INV-202503-0001");
    }

    #[test]
    fn test_unauthorized_clears_session() {
        let mut api = client(&[(401, json!({ "message": "jwt expired" }))]);

        let err = api.delete(Resource::Clients, "9").unwrap_err();
        assert!(matches!(err, TrackerError::Unauthorized));
        assert!(!api.session().is_authenticated());

        let err = api.delete(Resource::Clients, "9").unwrap_err();
        assert!(matches!(err, TrackerError::NotLoggedIn));
    }

    #[test]
    fn test_server_message_is_surfaced() {
        let mut api = client(&[
            (422, json!({ "message": "Invoice number already exists" })),
            (500, json!("oops")),
        ]);

        let err = api.update::<_, Value>(Resource::Invoices, "1", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Invoice number already exists (HTTP 422)");

        let err = api.get::<Value>(Resource::Invoices, "1").unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 500 (HTTP 500)");
        assert!(api.session().is_authenticated());
    }

    #[test]
    fn test_login_failure_keeps_message() {
        let mut api = ApiClient::new(
            "http://api.test/api/v1",
            FakeTransport::replying(&[(401, json!({ "message": "Invalid credentials" }))]),
            Session::default(),
        );

        let err = api
            .login(&LoginRequest {
                email: "a@b.test".to_string(),
                password: "nope".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials (HTTP 401)");
    }

    #[test]
    fn test_stats_unsupported_for_vendors() {
        let mut api = client(&[]);
        assert!(matches!(
            api.stats(Resource::Vendors),
            Err(TrackerError::Unsupported(_))
        ));
    }

    #[test]
    fn test_reject_expense_body() {
        let mut api = client(&[(200, json!({ "data": { "id": "e1", "status": "rejected" } }))]);

        let result = api.reject_expense("e1", "duplicate receipt").unwrap();
        assert_eq!(result["status"], "rejected");

        let sent = api.transport().last();
        assert_eq!(sent.url, "http://api.test/api/v1/expenses/e1/reject");
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["rejectionReason"], "duplicate receipt");
    }
}
