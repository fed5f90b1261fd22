use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::backend::{Backend, BackendError};
use crate::types::{
    AuthState, Chat, ChatId, ChatList, ConnectionParameters, File, FileId, Message, MessageId,
    PageRequest, ReplyInfo,
};

/// TDLib JSON objects relayed over a websocket, one object per text frame.
pub struct TdJsonClient {
    ws: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    next_extra: u64,
}

#[derive(Deserialize)]
struct Chats {
    #[serde(default)]
    chat_ids: Vec<ChatId>,
}

#[derive(Deserialize)]
struct Messages {
    #[serde(default)]
    messages: Vec<Option<Message>>,
}

impl Messages {
    fn into_vec(self) -> Vec<Message> {
        self.messages.into_iter().flatten().collect()
    }
}

#[derive(Deserialize)]
struct MessageThreadInfo {
    #[serde(default)]
    reply_info: Option<ReplyInfo>,
}

impl TdJsonClient {
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let url = Url::parse(url)?;
        let (ws, _) = connect_async(url).await?;
        log::debug!("connected to tdjson bridge");
        Ok(Self { ws, next_extra: 0 })
    }

    async fn call<T: DeserializeOwned>(&mut self, request: Value) -> Result<T, BackendError> {
        let response = self.send(request).await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn call_ok(&mut self, request: Value) -> Result<(), BackendError> {
        self.send(request).await.map(|_| ())
    }

    async fn send(&mut self, mut request: Value) -> Result<Value, BackendError> {
        let extra = self.next_extra();
        request["@extra"] = Value::String(extra.clone());
        log::trace!("td send {}", request["@type"]);
        self.ws.send(WsMessage::Text(request.to_string())).await?;

        loop {
            let mut response = self.read_object().await?;
            if response.get("@extra").and_then(Value::as_str) != Some(extra.as_str()) {
                log::trace!("td update {}", response["@type"]);
                continue;
            }
            if response["@type"] == "error" {
                return Err(BackendError::Td {
                    code: response["code"].as_i64().unwrap_or_default() as i32,
                    message: response["message"].as_str().unwrap_or_default().to_string(),
                });
            }
            if let Some(object) = response.as_object_mut() {
                object.remove("@extra");
            }
            return Ok(response);
        }
    }

    async fn read_object(&mut self) -> Result<Value, BackendError> {
        loop {
            let message = self.ws.next().await.ok_or(BackendError::Closed)??;
            match message {
                WsMessage::Text(text) => return Ok(serde_json::from_str(&text)?),
                WsMessage::Binary(data) => return Ok(serde_json::from_slice(&data)?),
                WsMessage::Close(_) => return Err(BackendError::Closed),
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                _ => continue,
            }
        }
    }

    fn next_extra(&mut self) -> String {
        self.next_extra = self.next_extra.wrapping_add(1);
        format!("tdarchive-{}", self.next_extra)
    }
}

fn page_fields(request: &mut Value, page: PageRequest) {
    request["from_message_id"] = json!(page.from_message_id);
    request["offset"] = json!(page.offset);
    request["limit"] = json!(page.limit);
}

impl Backend for TdJsonClient {
    async fn authorization_state(&mut self) -> Result<AuthState, BackendError> {
        self.call(json!({ "@type": "getAuthorizationState" })).await
    }

    async fn check_encryption_key(&mut self) -> Result<(), BackendError> {
        self.call_ok(json!({
            "@type": "checkDatabaseEncryptionKey",
            "encryption_key": "",
        }))
        .await
    }

    async fn set_parameters(&mut self, parameters: &ConnectionParameters) -> Result<(), BackendError> {
        let mut parameters = serde_json::to_value(parameters)?;
        parameters["@type"] = json!("tdlibParameters");
        self.call_ok(json!({
            "@type": "setTdlibParameters",
            "parameters": parameters,
        }))
        .await
    }

    async fn set_phone_number(&mut self, phone_number: &str) -> Result<(), BackendError> {
        self.call_ok(json!({
            "@type": "setAuthenticationPhoneNumber",
            "phone_number": phone_number,
        }))
        .await
    }

    async fn check_password(&mut self, password: &str) -> Result<(), BackendError> {
        self.call_ok(json!({
            "@type": "checkAuthenticationPassword",
            "password": password,
        }))
        .await
    }

    async fn check_code(&mut self, code: &str) -> Result<(), BackendError> {
        self.call_ok(json!({
            "@type": "checkAuthenticationCode",
            "code": code,
        }))
        .await
    }

    async fn log_out(&mut self) -> Result<(), BackendError> {
        self.call_ok(json!({ "@type": "logOut" })).await
    }

    async fn set_log_verbosity(&mut self, level: i32) -> Result<(), BackendError> {
        self.call_ok(json!({
            "@type": "setLogVerbosityLevel",
            "new_verbosity_level": level,
        }))
        .await
    }

    async fn get_chat(&mut self, chat_id: ChatId) -> Result<Chat, BackendError> {
        self.call(json!({ "@type": "getChat", "chat_id": chat_id })).await
    }

    async fn get_chats(&mut self, list: ChatList, limit: i32) -> Result<Vec<ChatId>, BackendError> {
        let chats: Chats = self
            .call(json!({
                "@type": "getChats",
                "chat_list": { "@type": list.type_name() },
                "limit": limit,
            }))
            .await?;
        Ok(chats.chat_ids)
    }

    async fn get_chat_history(
        &mut self,
        chat_id: ChatId,
        request: PageRequest,
    ) -> Result<Vec<Message>, BackendError> {
        let mut body = json!({
            "@type": "getChatHistory",
            "chat_id": chat_id,
            "only_local": false,
        });
        page_fields(&mut body, request);
        let messages: Messages = self.call(body).await?;
        Ok(messages.into_vec())
    }

    async fn get_message(&mut self, chat_id: ChatId, message_id: MessageId) -> Result<Message, BackendError> {
        self.call(json!({
            "@type": "getMessage",
            "chat_id": chat_id,
            "message_id": message_id,
        }))
        .await
    }

    async fn get_message_thread(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<ReplyInfo, BackendError> {
        let info: MessageThreadInfo = self
            .call(json!({
                "@type": "getMessageThread",
                "chat_id": chat_id,
                "message_id": message_id,
            }))
            .await?;
        Ok(info.reply_info.unwrap_or_default())
    }

    async fn get_message_thread_history(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
        request: PageRequest,
    ) -> Result<Vec<Message>, BackendError> {
        let mut body = json!({
            "@type": "getMessageThreadHistory",
            "chat_id": chat_id,
            "message_id": message_id,
        });
        page_fields(&mut body, request);
        let messages: Messages = self.call(body).await?;
        Ok(messages.into_vec())
    }

    async fn download_file(&mut self, file_id: FileId, priority: i32) -> Result<File, BackendError> {
        self.call(json!({
            "@type": "downloadFile",
            "file_id": file_id,
            "priority": priority,
            "offset": 0,
            "limit": 0,
            "synchronous": true,
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::{WebSocketStream, accept_async};

    use super::*;

    /// Serves one websocket connection on a local port with `script`.
    async fn bridge<F, Fut>(script: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let ws = accept_async(stream).await.expect("handshake");
            script(ws).await;
        });
        format!("ws://{addr}/td")
    }

    async fn next_request(ws: &mut WebSocketStream<TcpStream>) -> Value {
        loop {
            match ws.next().await.expect("request").expect("frame") {
                WsMessage::Text(text) => return serde_json::from_str(&text).expect("json"),
                _ => continue,
            }
        }
    }

    async fn push(ws: &mut WebSocketStream<TcpStream>, object: Value) {
        ws.send(WsMessage::Text(object.to_string())).await.expect("push");
    }

    #[tokio::test]
    async fn replies_are_matched_by_extra_until_error_and_close() {
        let url = bridge(|mut ws| async move {
            let request = next_request(&mut ws).await;
            assert_eq!(request["@type"], "getAuthorizationState");
            let extra = request["@extra"].clone();
            push(&mut ws, json!({ "@type": "updateOption", "name": "version" })).await;
            push(&mut ws, json!({ "@type": "authorizationStateClosed", "@extra": "other-7" })).await;
            push(
                &mut ws,
                json!({ "@type": "authorizationStateWaitPassword", "password_hint": "pet", "@extra": extra }),
            )
            .await;

            let request = next_request(&mut ws).await;
            assert_eq!(request["@type"], "checkAuthenticationCode");
            assert_ne!(request["@extra"], extra);
            push(
                &mut ws,
                json!({ "@type": "error", "code": 400, "message": "PHONE_CODE_INVALID", "@extra": request["@extra"] }),
            )
            .await;

            next_request(&mut ws).await;
            ws.close(None).await.expect("close");
        })
        .await;

        let mut client = TdJsonClient::connect(&url).await.expect("connect");
        let state = client.authorization_state().await.expect("state");
        assert_eq!(
            state,
            AuthState::WaitPassword {
                password_hint: "pet".to_string()
            }
        );

        let error = client.check_code("11111").await.expect_err("rejected code");
        assert!(
            matches!(&error, BackendError::Td { code: 400, message } if message == "PHONE_CODE_INVALID"),
            "unexpected error {error:?}"
        );

        let error = client.log_out().await.expect_err("closed bridge");
        assert!(matches!(error, BackendError::Closed), "unexpected error {error:?}");
    }

    #[tokio::test]
    async fn extra_is_stripped_from_replies() {
        let url = bridge(|mut ws| async move {
            for _ in 0..2 {
                let request = next_request(&mut ws).await;
                let mut reply = json!({ "@type": "optionValueString", "value": "1.8.0" });
                reply["@extra"] = request["@extra"].clone();
                push(&mut ws, reply).await;
            }
        })
        .await;

        let mut client = TdJsonClient::connect(&url).await.expect("connect");
        for _ in 0..2 {
            let reply = client.send(json!({ "@type": "getOption", "name": "version" })).await.expect("reply");
            assert_eq!(reply["value"], "1.8.0");
            assert!(reply.get("@extra").is_none());
        }
        assert_eq!(client.next_extra, 2);
    }

    #[test]
    fn null_messages_are_dropped() {
        let messages: Messages = serde_json::from_value(json!({
            "@type": "messages",
            "total_count": 3,
            "messages": [
                { "id": 5, "content": { "@type": "messageText", "text": { "text": "a" } } },
                null,
                { "id": 3, "content": { "@type": "messageUnsupported" } }
            ]
        }))
        .unwrap();
        let ids: Vec<_> = messages.into_vec().iter().map(|message| message.id).collect();
        assert_eq!(ids, vec![5, 3]);
    }

    #[test]
    fn page_fields_are_written() {
        let mut body = json!({ "@type": "getChatHistory" });
        page_fields(
            &mut body,
            PageRequest {
                from_message_id: 42,
                offset: -1,
                limit: 10,
            },
        );
        assert_eq!(body["from_message_id"], 42);
        assert_eq!(body["offset"], -1);
        assert_eq!(body["limit"], 10);
    }

    #[test]
    fn thread_info_without_replies_defaults() {
        let info: MessageThreadInfo = serde_json::from_value(json!({
            "@type": "messageThreadInfo",
            "chat_id": 1,
            "message_thread_id": 9
        }))
        .unwrap();
        assert_eq!(info.reply_info.unwrap_or_default().reply_count, 0);
    }
}
