use std::time::Instant;

use metrics::{counter, histogram};
use num_bigint::BigUint;
use rand_core::RngCore;
use tonic::{Request, Response, Status};
use tracing::debug;

use super::config::RateLimiter;
use super::state::{ChallengeRecord, ServerState, SessionRecord, UserRecord, CHALLENGE_EXPIRY_SECONDS};
use crate::proto::auth_service_server::AuthService;
use crate::proto::{
    LoginFinishRequest, LoginFinishResponse, LoginStartRequest, LoginStartResponse,
    RegisterRequest, RegisterResponse, WhoamiRequest, WhoamiResponse,
};
use crate::scheme::{self, SchemeKind, SchnorrGroup, VerificationMaterial};
use crate::session::SessionKeeper;
use crate::{Error, SecureRng};

/// Nonce length in bytes (256 bits of entropy).
const NONCE_BYTES: usize = 32;

/// Display prefix length for identifiers echoed back to callers.
const DISPLAY_PREFIX: usize = 16;

/// gRPC service implementing the challenge-response authentication protocol.
pub struct AuthServiceImpl {
    state: ServerState,
    rate_limiter: RateLimiter,
    group: SchnorrGroup,
    sessions: SessionKeeper,
}

impl AuthServiceImpl {
    /// Creates a new authentication service.
    pub fn new(
        state: ServerState,
        rate_limiter: RateLimiter,
        group: SchnorrGroup,
        sessions: SessionKeeper,
    ) -> Self {
        Self {
            state,
            rate_limiter,
            group,
            sessions,
        }
    }

    #[allow(clippy::result_large_err)]
    fn validate_identifier(identifier: &str) -> Result<(), Status> {
        if identifier.is_empty() {
            return Err(Status::invalid_argument("Identifier cannot be empty"));
        }

        if identifier.len() > 256 {
            return Err(Status::invalid_argument("Identifier too long"));
        }

        if !identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(Status::invalid_argument(
                "Identifier contains invalid characters",
            ));
        }

        Ok(())
    }

    fn display_identifier(identifier: &str) -> String {
        if identifier.len() > DISPLAY_PREFIX {
            format!("{}...", &identifier[..DISPLAY_PREFIX])
        } else {
            identifier.to_string()
        }
    }

    #[allow(clippy::result_large_err)]
    fn decode_element(group: &SchnorrGroup, hex_value: &str, what: &str) -> Result<BigUint, Status> {
        let bytes = hex::decode(hex_value)
            .map_err(|_| Status::invalid_argument(format!("Invalid {what}: not hex")))?;
        let value = BigUint::from_bytes_be(&bytes);
        group
            .validate_element(&value)
            .map_err(|e| Status::invalid_argument(format!("Invalid {what}: {e}")))?;
        Ok(value)
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let start = Instant::now();
        counter!("auth.register.requests").increment(1);

        self.rate_limiter.check_rate_limit().await?;

        let req = request.into_inner();

        Self::validate_identifier(&req.identifier)?;

        let scheme = SchemeKind::parse(&req.scheme)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        if req.material.is_empty() {
            return Err(Status::invalid_argument("Empty verification material"));
        }

        if req.material.len() > 4096 {
            return Err(Status::invalid_argument("Verification material too large"));
        }

        let material = VerificationMaterial::parse(scheme, &self.group, &req.material)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let record = UserRecord {
            identifier: req.identifier.clone(),
            material,
            registered_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_else(|_| unreachable!("System time is after UNIX_EPOCH"))
                .as_secs(),
        };

        let result = self.state.register_user(record).await.map_err(|e| match e {
            Error::Conflict(_) => Status::already_exists(e.to_string()),
            other => Status::invalid_argument(other.to_string()),
        });

        histogram!("auth.register.duration").record(start.elapsed().as_secs_f64());

        if result.is_ok() {
            counter!("auth.register.success").increment(1);
        } else {
            counter!("auth.register.failure").increment(1);
        }

        result?;

        Ok(Response::new(RegisterResponse {
            success: true,
            message: "Registered successfully".to_string(),
            identifier: Self::display_identifier(&req.identifier),
        }))
    }

    async fn start_login(
        &self,
        request: Request<LoginStartRequest>,
    ) -> Result<Response<LoginStartResponse>, Status> {
        let start = Instant::now();
        counter!("auth.login_start.requests").increment(1);

        self.rate_limiter.check_rate_limit().await?;

        let req = request.into_inner();

        Self::validate_identifier(&req.identifier)?;

        let user = self
            .state
            .get_user(&req.identifier)
            .await
            .ok_or_else(|| Status::not_found(format!("Identifier '{}' not found", req.identifier)))?;

        let mut rng = SecureRng::new();
        let mut nonce = vec![0u8; NONCE_BYTES];
        rng.fill_bytes(&mut nonce);

        // The Schnorr commitment arrives with login-start so the verifier
        // exponent c is provably chosen after y1 is fixed.
        let (commitment, exponent) = match user.material.scheme() {
            SchemeKind::Schnorr => {
                if req.commitment.is_empty() {
                    return Err(Status::invalid_argument(
                        "Commitment is required for the schnorr scheme",
                    ));
                }
                let y1 = Self::decode_element(&self.group, &req.commitment, "commitment")?;
                let c = self.group.random_exponent(&mut rng);
                (Some(y1), Some(c))
            }
            SchemeKind::EcdsaP256 => {
                if !req.commitment.is_empty() {
                    return Err(Status::invalid_argument(
                        "Commitment is not used by the ecdsa-p256 scheme",
                    ));
                }
                (None, None)
            }
        };

        let exponent_hex = exponent
            .as_ref()
            .map(|c| hex::encode(c.to_bytes_be()))
            .unwrap_or_default();

        let record = ChallengeRecord::new(req.identifier.clone(), nonce.clone(), exponent, commitment);
        self.state.put_challenge(record).await;

        histogram!("auth.login_start.duration").record(start.elapsed().as_secs_f64());
        counter!("auth.login_start.success").increment(1);

        Ok(Response::new(LoginStartResponse {
            nonce: hex::encode(&nonce),
            c: exponent_hex,
            expires_in: CHALLENGE_EXPIRY_SECONDS,
        }))
    }

    async fn finish_login(
        &self,
        request: Request<LoginFinishRequest>,
    ) -> Result<Response<LoginFinishResponse>, Status> {
        let start = Instant::now();
        counter!("auth.login_finish.requests").increment(1);

        self.rate_limiter.check_rate_limit().await?;

        let req = request.into_inner();

        Self::validate_identifier(&req.identifier)?;

        if req.nonce.is_empty() || req.nonce.len() > 128 {
            return Err(Status::invalid_argument("Invalid nonce"));
        }

        if req.proof.is_empty() {
            return Err(Status::invalid_argument("Empty proof"));
        }

        if req.proof.len() > 8192 {
            return Err(Status::invalid_argument("Proof too large"));
        }

        let nonce = hex::decode(&req.nonce)
            .map_err(|_| Status::invalid_argument("Invalid nonce: not hex"))?;

        let proof = hex::decode(&req.proof)
            .map_err(|_| Status::invalid_argument("Invalid proof: not hex"))?;

        // The consume is the replay boundary: it happens-before the crypto
        // check, and a failed check never resurrects the challenge.
        let result = self.verify_attempt(&req.identifier, &nonce, &proof).await;

        histogram!("auth.login_finish.duration").record(start.elapsed().as_secs_f64());

        match result {
            Ok(minted) => {
                counter!("auth.login_finish.success").increment(1);
                Ok(Response::new(LoginFinishResponse {
                    success: true,
                    token: minted.token,
                    expires_in: minted.expires_in,
                }))
            }
            Err(e) => {
                counter!("auth.login_finish.failure").increment(1);
                debug!(identifier = %req.identifier, reason = %e, "login attempt rejected");
                Err(Status::permission_denied("Authentication failed"))
            }
        }
    }

    async fn whoami(
        &self,
        request: Request<WhoamiRequest>,
    ) -> Result<Response<WhoamiResponse>, Status> {
        counter!("auth.whoami.requests").increment(1);

        self.rate_limiter.check_rate_limit().await?;

        let req = request.into_inner();

        if req.token.is_empty() {
            return Err(Status::unauthenticated("Access token required"));
        }

        let identifier = self.sessions.validate(&req.token).map_err(|e| match e {
            Error::TokenExpired => Status::permission_denied("Invalid or expired token"),
            _ => Status::unauthenticated("Invalid or expired token"),
        })?;

        Ok(Response::new(WhoamiResponse {
            identifier: Self::display_identifier(&identifier),
            authenticated: true,
        }))
    }
}

impl AuthServiceImpl {
    /// Consumes the challenge, verifies the proof against the registered
    /// material, and mints a session on success.
    ///
    /// Internal failure reasons stay here (logged at debug); the caller
    /// collapses them all to one undifferentiated outcome.
    async fn verify_attempt(
        &self,
        identifier: &str,
        nonce: &[u8],
        proof: &[u8],
    ) -> crate::Result<crate::session::SessionToken> {
        let challenge = self.state.consume_challenge(identifier, nonce).await?;

        let user = self
            .state
            .get_user(identifier)
            .await
            .ok_or(Error::AuthenticationFailed)?;

        scheme::verify_login_proof(
            &self.group,
            &user.material,
            &challenge.nonce,
            challenge.commitment.as_ref(),
            challenge.exponent.as_ref(),
            proof,
        )?;

        let minted = self.sessions.mint(identifier);
        self.state
            .record_session(SessionRecord::new(
                minted.token.clone(),
                identifier.to_string(),
                minted.expires_in,
            ))
            .await?;

        Ok(minted)
    }
}
