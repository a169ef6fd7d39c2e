#![allow(dead_code)]

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use unimate_lib::database::{self, NewUser, User, UserStore, UserUpdate};
use unimate_lib::webhook::{AssistantGateway, AssistantReply, AssistantRequest, GatewayError, ReplyField};

/// Gateway that answers from a queue and remembers every request.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, u16>>>,
    requests: Mutex<Vec<AssistantRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, status: u16) -> Self {
        self.replies.lock().push_back(Err(status));
        self
    }

    pub fn requests(&self) -> Vec<AssistantRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.kind() == kind).count()
    }
}

impl AssistantGateway for ScriptedGateway {
    async fn send(&self, request: AssistantRequest) -> Result<AssistantReply, GatewayError> {
        self.requests.lock().push(request);
        match self.replies.lock().pop_front() {
            Some(Ok(text)) => Ok(AssistantReply { text, field: ReplyField::Output }),
            Some(Err(status)) => Err(GatewayError::Status(status)),
            None => Err(GatewayError::MissingReplyField),
        }
    }
}

impl AssistantGateway for &ScriptedGateway {
    async fn send(&self, request: AssistantRequest) -> Result<AssistantReply, GatewayError> {
        (**self).send(request).await
    }
}

/// `users` table kept in memory.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    lookups: Mutex<usize>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, email: &str, password: &str) -> Self {
        let id = self.users.lock().len() as i64 + 1;
        self.users.lock().push(User {
            user_id: id,
            name: "Test Student".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: database::Role::Student,
            created_at: Utc::now(),
            year: 2,
            department: "IT".to_string(),
        });
        self
    }

    /// Number of calls that reached the store.
    pub fn lookups(&self) -> usize {
        *self.lookups.lock()
    }

    fn touch(&self) {
        *self.lookups.lock() += 1;
    }
}

impl UserStore for MemoryUserStore {
    async fn find_user_by_credentials(&self, email: &str, password: &str) -> database::Result<Option<User>> {
        self.touch();
        Ok(self
            .users
            .lock()
            .iter()
            .find(|u| u.email == email && u.password == password)
            .cloned())
    }

    async fn get_user_by_id(&self, user_id: i64) -> database::Result<Option<User>> {
        self.touch();
        Ok(self.users.lock().iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn email_exists(&self, email: &str) -> database::Result<bool> {
        self.touch();
        Ok(self.users.lock().iter().any(|u| u.email == email))
    }

    async fn insert_user(&self, user: &NewUser) -> database::Result<User> {
        self.touch();
        let mut users = self.users.lock();
        let created = User {
            user_id: users.len() as i64 + 1,
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            role: user.role,
            created_at: Utc::now(),
            year: user.year,
            department: user.department.clone(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, user_id: i64, update: &UserUpdate) -> database::Result<User> {
        self.touch();
        let mut users = self.users.lock();
        let user = users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| database::DatabaseError::UserNotFound(user_id.to_string()))?;
        update.apply_to(user);
        Ok(user.clone())
    }
}

/// Serves exactly one HTTP response and hands back the raw request it got.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/webhook/chat", listener.local_addr().unwrap());
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// The JSON body of a raw HTTP request.
pub fn request_body(raw: &str) -> serde_json::Value {
    let (_, body) = raw.split_once("\r\n\r\n").unwrap();
    serde_json::from_str(body).unwrap()
}
