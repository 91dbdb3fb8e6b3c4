use argon2::{Argon2, PasswordHasher};
use clap::{Parser, Subcommand};
use num_bigint::BigUint;
use tonic::Request;
use zkauth::proto::auth_service_client::AuthServiceClient;
use zkauth::proto::{
    LoginFinishRequest, LoginStartRequest, RegisterRequest, WhoamiRequest,
};
use zkauth::{SchnorrGroup, SchnorrProver};

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "Challenge-response authentication client", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:50051")]
    server: String,

    /// Use the toy demonstration group (must match the server)
    #[arg(long, default_value = "false")]
    demo_group: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Register {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        password: String,
    },

    Login {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        password: String,
    },

    Whoami {
        #[arg(short, long)]
        token: String,
    },
}

/// Derives the Schnorr secret exponent from a passphrase.
///
/// Argon2 with a per-user salt, reduced into `[1, p-2]`. The same
/// (user, password) pair always lands on the same exponent, so the client
/// needs no local key storage.
fn password_to_exponent(password: &str, user_id: &str, group: &SchnorrGroup) -> BigUint {
    use argon2::password_hash::SaltString;
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(b"zkauth-v1-");
    hasher.update(user_id.as_bytes());
    let hash_result = hasher.finalize();

    let salt = SaltString::encode_b64(&hash_result[..16])
        .unwrap_or_else(|e| panic!("Salt encoding failed: {e}"));

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .unwrap_or_else(|e| panic!("Password hashing failed: {e}"));

    let hash_bytes = hash
        .hash
        .unwrap_or_else(|| unreachable!("Hash always present"));

    let raw = BigUint::from_bytes_be(hash_bytes.as_bytes());
    let range = group.modulus() - 2u32;
    (raw % range) + 1u32
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let group = if cli.demo_group {
        SchnorrGroup::demo()
    } else {
        SchnorrGroup::modp_2048()
    };

    let mut client = AuthServiceClient::connect(cli.server.clone()).await?;

    match cli.command {
        Commands::Register { user, password } => {
            println!("Registering user '{user}'...");

            let x = password_to_exponent(&password, &user, &group);
            let prover = SchnorrProver::from_secret(group, &x)?;

            let request = Request::new(RegisterRequest {
                identifier: user.clone(),
                scheme: "schnorr".to_string(),
                material: prover.registration_material(),
            });

            let response = client.register(request).await?.into_inner();

            if response.success {
                println!("Success: {}", response.message);
            } else {
                eprintln!("Failed: {}", response.message);
                std::process::exit(1);
            }
        }

        Commands::Login { user, password } => {
            println!("Authenticating user '{user}'...");

            let x = password_to_exponent(&password, &user, &group);
            let prover = SchnorrProver::from_secret(group, &x)?;

            let (pending, commitment) = prover.commit();

            let request = Request::new(LoginStartRequest {
                identifier: user.clone(),
                commitment,
            });

            let response = client.start_login(request).await?.into_inner();

            println!("Challenge received, expires in {}s", response.expires_in);

            let proof = prover.respond(pending, &response.c)?;

            let request = Request::new(LoginFinishRequest {
                identifier: user.clone(),
                nonce: response.nonce,
                proof,
            });

            let response = client.finish_login(request).await?.into_inner();

            if response.success {
                println!("Authenticated. Token valid for {}s", response.expires_in);
                println!("Session token: {}", response.token);
            } else {
                eprintln!("Authentication failed");
                std::process::exit(1);
            }
        }

        Commands::Whoami { token } => {
            let request = Request::new(WhoamiRequest { token });
            let response = client.whoami(request).await?.into_inner();

            if response.authenticated {
                println!("Authenticated as: {}", response.identifier);
            } else {
                eprintln!("Not authenticated");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
