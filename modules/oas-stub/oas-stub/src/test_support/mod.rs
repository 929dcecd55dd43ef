//! Test utilities for stub engine unit and integration tests.

pub mod clock;
pub mod harness;
pub mod plugin;
pub mod request;
pub mod response;

pub use clock::ManualClock;
pub use harness::{AppHarness, AppHarnessBuilder};
pub use plugin::{STATIC_PLUGIN_TYPE, StaticPlugin, StaticPluginCompiler};
pub use request::RequestCase;
pub use response::TestResponse;

/// Petstore document used across integration tests.
///
/// `GET /v1/pets/{id}` returns a pet whose `id` has `minimum: 1`; `POST
/// /v1/pets` requires a JSON body with a `name`; `GET /v1/secure` requires an
/// `X-Api-Key` API key header.
pub const PETSTORE_SPEC: &str = r"
openapi: 3.0.3
info:
  title: petstore
  version: '1.0'
servers:
  - url: http://localhost/v1
paths:
  /pets:
    get:
      responses:
        '200':
          description: all pets
          content:
            application/json:
              schema:
                type: array
                maxItems: 2
                items:
                  $ref: '#/components/schemas/Pet'
    post:
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/NewPet'
      responses:
        '201':
          description: created
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
        '400':
          description: invalid
  /pets/{id}:
    get:
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: integer
            minimum: 1
      responses:
        '200':
          description: one pet
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
        '404':
          description: missing
  /secure:
    get:
      security:
        - apiKey: []
      responses:
        '200':
          description: ok
          content:
            text/plain:
              schema:
                type: string
                enum: [granted]
        '401':
          description: who are you
components:
  securitySchemes:
    apiKey:
      type: apiKey
      in: header
      name: X-Api-Key
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id:
          type: integer
          format: int64
          minimum: 1
        name:
          type: string
          example: rex
    NewPet:
      type: object
      required: [name]
      properties:
        name:
          type: string
";
