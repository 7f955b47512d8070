#![allow(dead_code)]

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use checkout_service::application::payment_service::PaymentSettings;
use checkout_service::domain::money::Currency;
use checkout_service::domain::payment::{
    CreatedIntent, Customer, CustomerParams, EphemeralKey, IntentParams, ProcessorError, SecretKey,
};
use checkout_service::domain::ports::PaymentProcessor;
use checkout_service::infrastructure::memory_repo::InMemoryOrderRepository;
use checkout_service::{build_server, AppState};
use reqwest::Client;

/// Which processor step should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailAt {
    #[default]
    Nothing,
    Customer,
    EphemeralKey,
    Intent,
}

/// In-process stand-in for the payment processor that counts every call.
#[derive(Default)]
pub struct RecordingProcessor {
    pub fail_at: FailAt,
    pub customers: AtomicUsize,
    pub ephemeral_keys: AtomicUsize,
    pub intents: AtomicUsize,
    pub deletes: AtomicUsize,
    pub intent_params: Mutex<Vec<IntentParams>>,
    pub ephemeral_key_versions: Mutex<Vec<String>>,
}

impl RecordingProcessor {
    pub fn failing_at(fail_at: FailAt) -> Self {
        Self {
            fail_at,
            ..Default::default()
        }
    }

    pub fn customer_calls(&self) -> usize {
        self.customers.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.customers.load(Ordering::SeqCst)
            + self.ephemeral_keys.load(Ordering::SeqCst)
            + self.intents.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    pub fn last_intent(&self) -> Option<IntentParams> {
        self.intent_params.lock().unwrap().last().cloned()
    }

    fn rejected(message: &str) -> ProcessorError {
        ProcessorError::Api {
            status: 400,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl PaymentProcessor for RecordingProcessor {
    async fn create_customer(
        &self,
        _key: &SecretKey,
        _params: &CustomerParams,
    ) -> Result<Customer, ProcessorError> {
        let n = self.customers.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == FailAt::Customer {
            return Err(Self::rejected("Invalid API Key provided"));
        }
        Ok(Customer {
            id: format!("cus_{n}"),
        })
    }

    async fn create_ephemeral_key(
        &self,
        _key: &SecretKey,
        customer_id: &str,
        api_version: &str,
    ) -> Result<EphemeralKey, ProcessorError> {
        self.ephemeral_keys.fetch_add(1, Ordering::SeqCst);
        self.ephemeral_key_versions
            .lock()
            .unwrap()
            .push(api_version.to_string());
        if self.fail_at == FailAt::EphemeralKey {
            return Err(Self::rejected("Stripe-Version header is invalid"));
        }
        Ok(EphemeralKey {
            id: format!("ephkey_{customer_id}"),
            secret: format!("ek_test_{customer_id}"),
        })
    }

    async fn create_payment_intent(
        &self,
        _key: &SecretKey,
        params: &IntentParams,
    ) -> Result<CreatedIntent, ProcessorError> {
        let n = self.intents.fetch_add(1, Ordering::SeqCst) + 1;
        self.intent_params.lock().unwrap().push(params.clone());
        if self.fail_at == FailAt::Intent {
            return Err(Self::rejected("Amount must be at least 5.00 mad"));
        }
        Ok(CreatedIntent {
            id: format!("pi_{n}"),
            client_secret: format!("pi_{n}_secret_test"),
        })
    }

    async fn delete_customer(
        &self,
        _key: &SecretKey,
        _customer_id: &str,
    ) -> Result<(), ProcessorError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).expect("valid decimal")
}

pub fn settings(currency: &str) -> PaymentSettings {
    PaymentSettings::new(Currency::new(currency).expect("valid currency"))
        .with_keys("sk_test_integration", "pk_test_integration")
}

pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<InMemoryOrderRepository>,
    pub processor: Arc<RecordingProcessor>,
}

pub fn test_app(processor: RecordingProcessor, settings: PaymentSettings) -> TestApp {
    let repo = Arc::new(InMemoryOrderRepository::new());
    let processor = Arc::new(processor);
    let state = AppState::new(repo.clone(), processor.clone(), settings);
    TestApp {
        state,
        repo,
        processor,
    }
}

pub fn free_port() -> u16 {
    // Bind to port 0 to let the OS assign a free port, then release it.
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind failed")
        .local_addr()
        .expect("addr failed")
        .port()
}

/// Start the real server on a free port and wait until it answers.
pub async fn spawn_server(state: AppState) -> String {
    let port = free_port();
    let server = build_server(state, "127.0.0.1", port).expect("Failed to bind the server");
    tokio::spawn(server);

    let base_url = format!("http://127.0.0.1:{}", port);
    let client = Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if tokio::time::Instant::now() > deadline {
            panic!("server did not become ready at {}", base_url);
        }
        if client
            .get(format!("{}/health", base_url))
            .send()
            .await
            .is_ok()
        {
            return base_url;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
