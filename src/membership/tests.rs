//! Membership Module Tests
//!
//! Validates heartbeat encoding, the membership registry and the admission rule.
//!
//! ## Test Scopes
//! - **Data Structures**: Unique ids, redacted secrets, wire field names.
//! - **Registry**: Duplicate suppression, ordering, snapshot isolation under concurrency.
//! - **Admission**: Self-exclusion, secret gating, and end-to-end discovery over loopback.

#[cfg(test)]
mod tests {
    use crate::config::NodeConfig;
    use crate::membership::codec::{self, HeartbeatError, MAX_HEARTBEAT_SIZE};
    use crate::membership::registry::MembershipRegistry;
    use crate::membership::service::DiscoveryService;
    use crate::membership::types::{ClusterSecret, Heartbeat, NodeId, NodeIdentity, PeerAddress};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    fn test_config(secret: &str) -> NodeConfig {
        let mut config = NodeConfig::new(ClusterSecret::new(secret));
        config.discovery_bind = "127.0.0.1:0".parse().unwrap();
        config.broadcast_addr = "127.0.0.1:9".parse().unwrap();
        config.heartbeat_interval = Duration::from_millis(50);
        config
    }

    async fn bind_service(config: &NodeConfig) -> Arc<DiscoveryService> {
        let identity = NodeIdentity::new(config.secret.clone(), 8080);
        DiscoveryService::bind(identity, Arc::new(MembershipRegistry::new()), config)
            .await
            .expect("Failed to bind discovery service")
    }

    fn peer(addr: &str) -> PeerAddress {
        let addr: SocketAddr = addr.parse().unwrap();
        PeerAddress {
            addr,
            http_addr: SocketAddr::new(addr.ip(), 8080),
        }
    }

    fn heartbeat_from(id: &str, secret: &str) -> Heartbeat {
        Heartbeat {
            id: NodeId(id.to_string()),
            secret: ClusterSecret::new(secret),
            http_port: Some(8080),
        }
    }

    // ============================================================
    // IDENTITY TESTS
    // ============================================================

    #[test]
    fn test_node_id_is_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();

        assert_ne!(id1, id2, "Each NodeId should be unique");
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = ClusterSecret::new("correct horse battery staple");
        let heartbeat = Heartbeat {
            id: NodeId::new(),
            secret: secret.clone(),
            http_port: None,
        };

        assert!(!format!("{:?}", secret).contains("horse"));
        assert!(!format!("{:?}", heartbeat).contains("horse"));
        assert_eq!(secret.expose(), "correct horse battery staple");
    }

    #[test]
    fn test_identity_heartbeat_announces_http_port() {
        let identity = NodeIdentity::new(ClusterSecret::new("s1"), 9090);
        let heartbeat = identity.heartbeat();

        assert_eq!(heartbeat.id, identity.id);
        assert_eq!(heartbeat.secret, identity.secret);
        assert_eq!(heartbeat.http_port, Some(9090));
    }

    // ============================================================
    // CODEC TESTS
    // ============================================================

    #[test]
    fn test_encoded_heartbeat_uses_wire_field_names() {
        let heartbeat = heartbeat_from("node-a", "s1");
        let encoded = codec::encode(&heartbeat).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(json["guid"], "node-a");
        assert_eq!(json["string"], "s1");
        assert_eq!(json["http_port"], 8080);
        assert!(encoded.len() <= MAX_HEARTBEAT_SIZE);
    }

    #[test]
    fn test_decode_heartbeat_without_http_port() {
        let decoded = codec::decode(br#"{"guid":"legacy-node","string":"s1"}"#).unwrap();

        assert_eq!(decoded.id, NodeId("legacy-node".to_string()));
        assert_eq!(decoded.secret, ClusterSecret::new("s1"));
        assert_eq!(decoded.http_port, None);
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let payloads: [&[u8]; 4] = [b"not json", b"", b"{\"guid\":1}", &[0xff, 0xfe, 0x00]];
        for payload in payloads {
            let result = codec::decode(payload);
            assert!(
                matches!(result, Err(HeartbeatError::Malformed(_))),
                "payload {:?} should be rejected",
                payload
            );
        }
    }

    #[test]
    fn test_encode_rejects_oversized_secret() {
        let heartbeat = heartbeat_from("node-a", &"x".repeat(MAX_HEARTBEAT_SIZE));

        let result = codec::encode(&heartbeat);

        assert!(matches!(result, Err(HeartbeatError::TooLarge { .. })));
    }

    // ============================================================
    // PEER ADDRESS TESTS
    // ============================================================

    #[test]
    fn test_peer_address_uses_announced_http_port() {
        let src: SocketAddr = "10.0.0.7:53211".parse().unwrap();
        let mut heartbeat = heartbeat_from("node-b", "s1");
        heartbeat.http_port = Some(9001);

        let peer = PeerAddress::from_heartbeat(src, &heartbeat, 8080);

        assert_eq!(peer.addr, src);
        assert_eq!(peer.http_addr, "10.0.0.7:9001".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_peer_address_falls_back_to_default_http_port() {
        let src: SocketAddr = "10.0.0.7:53211".parse().unwrap();
        let mut heartbeat = heartbeat_from("node-b", "s1");
        heartbeat.http_port = None;

        let peer = PeerAddress::from_heartbeat(src, &heartbeat, 8080);

        assert_eq!(peer.http_addr, "10.0.0.7:8080".parse::<SocketAddr>().unwrap());
    }

    // ============================================================
    // REGISTRY TESTS
    // ============================================================

    #[tokio::test]
    async fn test_registry_insert_if_absent() {
        let registry = MembershipRegistry::new();

        assert!(registry.insert_if_absent(peer("10.0.0.1:4000")).await);
        assert!(!registry.insert_if_absent(peer("10.0.0.1:4000")).await);
        assert!(registry.insert_if_absent(peer("10.0.0.1:4001")).await);

        assert_eq!(registry.len().await, 2);
        assert!(registry.contains(&"10.0.0.1:4000".parse().unwrap()).await);
    }

    #[tokio::test]
    async fn test_registry_preserves_admission_order() {
        let registry = MembershipRegistry::new();
        let addrs = ["10.0.0.3:1", "10.0.0.1:1", "10.0.0.2:1"];

        for addr in addrs {
            registry.insert_if_absent(peer(addr)).await;
        }

        let snapshot: Vec<String> = registry
            .snapshot()
            .await
            .iter()
            .map(|p| p.addr.to_string())
            .collect();
        assert_eq!(snapshot, addrs);
    }

    #[tokio::test]
    async fn test_registry_snapshot_is_a_copy() {
        let registry = MembershipRegistry::new();
        registry.insert_if_absent(peer("10.0.0.1:4000")).await;

        let snapshot = registry.snapshot().await;
        registry.insert_if_absent(peer("10.0.0.2:4000")).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_registry_concurrent_duplicate_inserts() {
        let registry = Arc::new(MembershipRegistry::new());
        let mut handles = Vec::new();

        for i in 0..64 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                // Half the tasks race on the same address, the rest are distinct.
                let addr = if i % 2 == 0 {
                    "10.0.0.1:4000".to_string()
                } else {
                    format!("10.0.1.{}:4000", i)
                };
                registry.insert_if_absent(peer(&addr)).await
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 33, "32 distinct addresses + 1 shared address");
        assert_eq!(registry.len().await, 33);
    }

    // ============================================================
    // ADMISSION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_admission_accepts_matching_secret() {
        let service = bind_service(&test_config("s1")).await;
        let src: SocketAddr = "192.168.1.20:40000".parse().unwrap();

        assert!(service.admit(&heartbeat_from("node-b", "s1"), src).await);

        let members = service.members().snapshot().await;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].addr, src);
        assert_eq!(members[0].http_addr, "192.168.1.20:8080".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_admission_excludes_self() {
        let service = bind_service(&test_config("s1")).await;
        let own = service.identity.heartbeat();

        for port in [1000, 2000, 3000] {
            let src = SocketAddr::new("127.0.0.1".parse().unwrap(), port);
            assert!(!service.admit(&own, src).await);
        }

        assert!(service.members().is_empty().await);
    }

    #[tokio::test]
    async fn test_admission_rejects_wrong_secret() {
        let service = bind_service(&test_config("s1")).await;

        for (i, secret) in ["s2", "", "S1", "s1 "].iter().enumerate() {
            let src = SocketAddr::new("10.0.0.9".parse().unwrap(), 5000 + i as u16);
            let heartbeat = heartbeat_from(&format!("node-{}", i), secret);
            assert!(!service.admit(&heartbeat, src).await);
        }

        // Even a heartbeat claiming our own id is gated on the secret first.
        let mut spoofed = service.identity.heartbeat();
        spoofed.secret = ClusterSecret::new("s2");
        assert!(!service.admit(&spoofed, "10.0.0.9:6000".parse().unwrap()).await);

        assert!(service.members().is_empty().await);
    }

    #[tokio::test]
    async fn test_admission_never_duplicates_sender() {
        let service = bind_service(&test_config("s1")).await;
        let src: SocketAddr = "10.0.0.5:41000".parse().unwrap();

        let mut admitted = 0;
        for _ in 0..10 {
            if service.admit(&heartbeat_from("node-b", "s1"), src).await {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(service.members().len().await, 1);
    }

    #[tokio::test]
    async fn test_handle_datagram_discards_malformed_payload() {
        let service = bind_service(&test_config("s1")).await;
        let src: SocketAddr = "10.0.0.5:41000".parse().unwrap();

        assert!(!service.handle_datagram(b"\x00\x01garbage", src).await);
        assert!(service.members().is_empty().await);

        let valid = codec::encode(&heartbeat_from("node-b", "s1")).unwrap();
        assert!(service.handle_datagram(&valid, src).await);
    }

    #[tokio::test]
    async fn test_bind_rejects_zero_interval() {
        let mut config = test_config("s1");
        config.heartbeat_interval = Duration::ZERO;
        let identity = NodeIdentity::new(config.secret.clone(), 8080);

        let result = DiscoveryService::bind(identity, Arc::new(MembershipRegistry::new()), &config).await;

        assert!(result.is_err());
    }

    // ============================================================
    // LOOPBACK DISCOVERY TESTS
    // ============================================================

    async fn wait_for_members(service: &DiscoveryService, expected: usize) -> bool {
        for _ in 0..60 {
            if service.members().len().await >= expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_broadcast_is_admitted_by_listener() {
        let receiver = bind_service(&test_config("s1")).await;
        let mut sender_config = test_config("s1");
        sender_config.broadcast_addr = receiver.listener_addr().unwrap();
        let sender = bind_service(&sender_config).await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listen = tokio::spawn(receiver.clone().listen_loop(shutdown_rx.clone()));
        let broadcast = tokio::spawn(sender.clone().broadcast_loop(shutdown_rx));

        assert!(wait_for_members(&receiver, 1).await, "sender was never admitted");

        // Several more ticks from the same sender must not add entries.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(receiver.members().len().await, 1);

        shutdown_tx.send(true).unwrap();
        listen.await.unwrap().unwrap();
        broadcast.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_own_broadcast_is_ignored() {
        let mut config = test_config("s1");
        let probe = bind_service(&config).await;
        // Point a node at its own listener: it hears itself but must not admit itself.
        config.discovery_bind = probe.listener_addr().unwrap();
        drop(probe);
        config.broadcast_addr = config.discovery_bind;
        let service = bind_service(&config).await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listen = tokio::spawn(service.clone().listen_loop(shutdown_rx.clone()));
        let broadcast = tokio::spawn(service.clone().broadcast_loop(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(service.members().is_empty().await);

        shutdown_tx.send(true).unwrap();
        listen.await.unwrap().unwrap();
        broadcast.await.unwrap().unwrap();
    }
}
