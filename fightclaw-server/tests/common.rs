#![allow(dead_code)]

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::net::TcpListener;
use uuid::Uuid;

use fightclaw_server::config::Config;

/// A running test server with two pre-registered, pre-verified agents.
pub struct TestServer {
    pub addr: String,
    pub pool: PgPool,
    pub agent_a: Uuid,
    pub agent_b: Uuid,
    pub client_a: reqwest::Client,
    pub client_b: reqwest::Client,
    // Keep the container alive for the lifetime of the test.
    _container: testcontainers::ContainerAsync<Postgres>,
}

fn hash_key(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

async fn register_agent(pool: &PgPool, name: &str, api_key: &str) -> Uuid {
    let agent_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO agents (id, name, api_key_hash, verified_at) VALUES ($1, $2, $3, NOW())",
    )
    .bind(agent_id)
    .bind(name)
    .bind(hash_key(api_key))
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO api_keys (id, agent_id, key_hash, key_prefix) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(agent_id)
    .bind(hash_key(api_key))
    .bind(&api_key[..api_key.len().min(8)])
    .execute(pool)
    .await
    .unwrap();

    agent_id
}

fn authed_client(api_key: &str) -> reqwest::Client {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::AUTHORIZATION,
        format!("Bearer {api_key}").parse().unwrap(),
    );
    reqwest::Client::builder().default_headers(headers).build().unwrap()
}

impl TestServer {
    pub async fn start() -> Self {
        let container = Postgres::default().start().await.unwrap();
        let host = container.get_host().await.unwrap();
        let port = container.get_host_port_ipv4(5432).await.unwrap();
        let database_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPool::connect(&database_url).await.unwrap();
        fightclaw_server::db::run_migrations(&pool).await.unwrap();

        let agent_a = register_agent(&pool, "agent-a", "test-key-a").await;
        let agent_b = register_agent(&pool, "agent-b", "test-key-b").await;

        let mut config = Config::from_env();
        config.database_url = database_url;
        config.turn_timeout = std::time::Duration::from_millis(200);
        config.test_mode = true;

        let router = fightclaw_server::build_router(pool.clone(), config).await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestServer {
            addr,
            pool,
            agent_a,
            agent_b,
            client_a: authed_client("test-key-a"),
            client_b: authed_client("test-key-b"),
            _container: container,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Pairs agent_a and agent_b through the matchmaker and returns the
    /// assigned `matchId`.
    pub async fn pair_agents(&self) -> Uuid {
        let resp_a: serde_json::Value = self
            .client_a
            .post(self.url("/v1/queue/join"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resp_a["status"], "waiting");
        let match_id_a: Uuid = serde_json::from_value(resp_a["matchId"].clone()).unwrap();

        let resp_b: serde_json::Value = self
            .client_b
            .post(self.url("/v1/queue/join"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resp_b["status"], "ready");
        let match_id_b: Uuid = serde_json::from_value(resp_b["matchId"].clone()).unwrap();
        assert_eq!(match_id_a, match_id_b);
        match_id_a
    }

    pub fn client_for(&self, agent_id: Uuid) -> &reqwest::Client {
        if agent_id == self.agent_a {
            &self.client_a
        } else if agent_id == self.agent_b {
            &self.client_b
        } else {
            panic!("unknown agent id {agent_id}");
        }
    }

    pub fn opponent_of(&self, agent_id: Uuid) -> Uuid {
        if agent_id == self.agent_a {
            self.agent_b
        } else {
            self.agent_a
        }
    }

    pub async fn state(&self, match_id: Uuid) -> serde_json::Value {
        self.client_a
            .get(self.url(&format!("/v1/matches/{match_id}/state")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}
