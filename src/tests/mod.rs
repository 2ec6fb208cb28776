
use crate::core::domain::model::server_config::ServerConfig;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

/// Token-mode config pointed at a mock server, with a distinct id per server.
pub(crate) fn token_config(server: &MockServer) -> ServerConfig {
    ServerConfig::builder()
        .host("127.0.0.1")
        .port(server.address().port())
        .token_auth("root@pam", "monitor", "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee")
        .verify_ssl(false)
        .build()
        .unwrap()
        .with_base_url(&server.uri())
        .unwrap()
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
}

pub(crate) async fn mount_version(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ok(json!({ "version": "8.2.4", "release": "8.2", "repoid": "faa83925" })))
        .mount(server)
        .await;
}

/// A two-node cluster: `pve1` fully healthy, `pve2` with failing status and
/// storage endpoints and no RRD data, plus one guest claiming an unknown node
/// and one without any identifier. `pve1` also mounts an unreachable NFS
/// pool that reports no capacity.
pub(crate) async fn mount_cluster(server: &MockServer) {
    mount_version(server).await;

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes"))
        .respond_with(ok(json!([
            {
                "node": "pve1", "status": "online", "cpu": 0.0512,
                "mem": 8_589_934_592_u64, "maxmem": 34_359_738_368_u64,
                "disk": 10_737_418_240_u64, "maxdisk": 107_374_182_400_u64,
                "uptime": 1_209_600, "type": "node", "id": "node/pve1"
            },
            {
                "node": "pve2", "status": "online", "cpu": 0.25,
                "mem": 1024, "maxmem": 4096, "disk": 500, "maxdisk": 0,
                "uptime": 3600, "type": "node", "id": "node/pve2"
            }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/status"))
        .respond_with(ok(json!({
            "loadavg": ["0.42", "0.37", "0.30"],
            "cpuinfo": {
                "model": "Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz",
                "mhz": "2400.000", "cores": 14, "sockets": 2, "cpus": 56
            },
            "memory": { "used": 8_589_934_592_u64, "total": 34_359_738_368_u64 },
            "rootfs": { "used": 10_737_418_240_u64, "total": 107_374_182_400_u64 },
            "uptime": 1_209_600
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/rrddata"))
        .and(query_param("timeframe", "hour"))
        .respond_with(ok(json!([
            { "time": 1_700_000_000, "loadavg": 0.55, "cpu": 0.05 },
            { "time": 1_700_000_060, "loadavg": 0.61, "cpu": 0.06 }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/qemu"))
        .respond_with(ok(json!([
            {
                "vmid": 100, "name": "web", "status": "running", "cpu": 0.12,
                "mem": 2_147_483_648_u64, "maxmem": 4_294_967_296_u64,
                "disk": 0, "maxdisk": 34_359_738_368_u64, "uptime": 86_400,
                "tags": "prod;web"
            },
            { "vmid": "101", "name": "db", "status": "stopped", "maxmem": 8_589_934_592_u64 },
            { "name": "broken", "status": "running" }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/lxc"))
        .respond_with(ok(json!([
            { "vmid": 200, "name": "dns", "status": "running", "mem": 100, "maxmem": 400 },
            { "vmid": 201, "name": "stray", "status": "running", "node": "pve9" }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/storage"))
        .respond_with(ok(json!([
            {
                "storage": "local", "type": "dir", "content": "iso,vztmpl,backup",
                "shared": 0, "enabled": 1, "active": 1,
                "used": 21_474_836_480_u64, "total": 85_899_345_920_u64,
                "avail": 64_424_509_440_u64
            },
            {
                "storage": "local-lvm", "type": "lvmthin", "content": "images,rootdir",
                "shared": 0, "enabled": 1, "active": 1,
                "used": 1, "total": 3, "avail": 2
            },
            {
                "storage": "backup-nfs", "type": "nfs", "content": "backup",
                "shared": 1, "enabled": 1, "active": 0,
                "used": 0, "total": 0, "avail": 0
            }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve2/storage"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage unavailable"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve2/status"))
        .respond_with(ResponseTemplate::new(500).set_body_string("status unavailable"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve2/rrddata"))
        .respond_with(ok(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve2/qemu"))
        .respond_with(ok(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve2/lxc"))
        .respond_with(ok(json!([
            { "id": "lxc/300", "status": "shutdown", "disk": 5, "maxdisk": 0 }
        ])))
        .mount(server)
        .await;
}
