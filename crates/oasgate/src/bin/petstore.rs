//! Petstore demo.
//!
//! Serves a small in-memory pet API from an embedded contract, or from the
//! JSON contract given as the first argument.
//!
//! ```text
//! OASGATE__VALIDATOR__STRICT=true cargo run --bin oasgate-petstore
//! curl http://127.0.0.1:8080/v1/pets/1
//! curl http://127.0.0.1:8080/api-docs
//! ```

use std::sync::Arc;

use anyhow::Context;
use http::StatusCode;
use oasgate::prelude::*;
use oasgate::server::serve;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::net::TcpListener;

const ADDR_VAR: &str = "OASGATE_ADDR";
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

fn embedded_contract() -> Value {
    json!({
        "openapi": "3.0.0",
        "info": { "title": "Petstore", "version": "1.0.0" },
        "servers": [{ "url": "/v1" }],
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "responses": {
                        "200": {
                            "description": "All pets",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "required": ["id", "name"],
                                            "properties": {
                                                "id": { "type": "integer" },
                                                "name": { "type": "string" },
                                                "tag": { "type": "string", "nullable": true }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "post": {
                    "operationId": "createPet",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "required": ["name"],
                                    "properties": {
                                        "name": { "type": "string" },
                                        "tag": { "type": "string", "nullable": true }
                                    }
                                }
                            }
                        }
                    },
                    "responses": {
                        "201": { "description": "Created" },
                        "default": { "description": "Error" }
                    }
                }
            },
            "/pets/{petId}": {
                "parameters": [
                    { "name": "petId", "in": "path", "required": true, "schema": { "type": "integer", "minimum": 1 } }
                ],
                "get": {
                    "operationId": "showPetById",
                    "responses": {
                        "200": {
                            "description": "A pet",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "required": ["id", "name"],
                                        "properties": {
                                            "id": { "type": "integer" },
                                            "name": { "type": "string" },
                                            "tag": { "type": "string", "nullable": true }
                                        }
                                    }
                                }
                            }
                        },
                        "4XX": { "description": "Not found" }
                    }
                }
            }
        }
    })
}

fn pets_controller(store: Arc<RwLock<Vec<Value>>>) -> Controller {
    let list = Arc::clone(&store);
    let create = Arc::clone(&store);
    let show = store;

    Controller::new()
        .handler("listPets", move |_req, res| {
            let pets = Value::Array(list.read().clone());
            async move { res.send(pets).map_err(|e| HandlerError::with_source("send failed", e)) }
        })
        .handler("createPet", move |req, mut res| {
            let store = Arc::clone(&create);
            async move {
                let mut pet: Value = req
                    .json()
                    .map_err(|e| HandlerError::with_source("invalid pet", e))?;
                let mut pets = store.write();
                pet["id"] = json!(pets.len() + 1);
                pets.push(pet.clone());
                drop(pets);

                res.status(StatusCode::CREATED);
                res.send(pet).map_err(|e| HandlerError::with_source("send failed", e))
            }
        })
        .handler("showPetById", move |req, mut res| {
            let store = Arc::clone(&show);
            async move {
                let id: u64 = req.param("petId").and_then(|id| id.parse().ok()).unwrap_or_default();
                let found = store.read().iter().find(|pet| pet["id"] == json!(id)).cloned();
                let sent = match found {
                    Some(pet) => res.send(pet),
                    None => {
                        res.status(StatusCode::NOT_FOUND);
                        res.send(json!({ "message": format!("Pet {id} not found") }))
                    }
                };
                sent.map_err(|e| HandlerError::with_source("send failed", e))
            }
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_development()
        .with_dotenv()?
        .with_env_prefix("OASGATE")
        .load()
        .context("loading configuration")?;
    init_logging(&config.logging.to_log_config()).context("initializing logging")?;

    let contract = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?
        }
        None => embedded_contract(),
    };

    let store = Arc::new(RwLock::new(vec![
        json!({ "id": 1, "name": "Rex", "tag": null }),
        json!({ "id": 2, "name": "Tom", "tag": "cat" }),
    ]));
    let controllers = ControllerRegistry::new().register("PetsController", pets_controller(store));

    let gateway = Gateway::builder(contract)
        .config(config)
        .controllers(controllers)
        .build()
        .await
        .context("initializing gateway")?;

    let addr = std::env::var(ADDR_VAR).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    serve(listener, GatewayHandle::new(gateway), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    })
    .await?;

    Ok(())
}
