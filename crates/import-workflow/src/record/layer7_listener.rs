use super::{port_violations, ImportRecord};
use crate::normalizer::{parse_ports, split_ids, FieldSpec};
use cloud_providers::Protocol;
use import_domain::{CreateLayer7ListenerDetail, RecordState, TaskOperation};

const SSL_MODE_UNIDIRECTIONAL: &str = "UNIDIRECTIONAL";
const SSL_MODE_MUTUAL: &str = "MUTUAL";

type Detail = CreateLayer7ListenerDetail;
type SetResult = std::result::Result<(), String>;

fn set_vip(d: &mut Detail, v: &str) -> SetResult {
    d.clb_vip_domain = v.to_string();
    Ok(())
}
fn set_clb(d: &mut Detail, v: &str) -> SetResult {
    d.cloud_clb_id = v.to_string();
    Ok(())
}
fn set_protocol(d: &mut Detail, v: &str) -> SetResult {
    d.protocol = v.to_uppercase();
    Ok(())
}
fn set_port(d: &mut Detail, v: &str) -> SetResult {
    d.listener_port = parse_ports(v)?;
    Ok(())
}
fn set_ssl_mode(d: &mut Detail, v: &str) -> SetResult {
    d.ssl_mode = v.to_uppercase();
    Ok(())
}
fn set_certs(d: &mut Detail, v: &str) -> SetResult {
    d.cert_cloud_ids = split_ids(v);
    Ok(())
}
fn set_ca(d: &mut Detail, v: &str) -> SetResult {
    d.ca_cloud_id = v.to_string();
    Ok(())
}
fn set_remark(d: &mut Detail, v: &str) -> SetResult {
    d.user_remark = v.to_string();
    Ok(())
}

const LISTENER_COLUMNS: &[FieldSpec<Detail>] = &[FieldSpec { name: "clb_vip_domain", set: set_vip },
                                                             FieldSpec { name: "cloud_clb_id", set: set_clb },
                                                             FieldSpec { name: "protocol", set: set_protocol },
                                                             FieldSpec { name: "listener_port", set: set_port },
                                                             FieldSpec { name: "ssl_mode", set: set_ssl_mode },
                                                             FieldSpec { name: "cert_cloud_ids", set: set_certs },
                                                             FieldSpec { name: "ca_cloud_id", set: set_ca },
                                                             FieldSpec { name: "user_remark", set: set_remark }];

impl ImportRecord for CreateLayer7ListenerDetail {
    const OPERATION: TaskOperation = TaskOperation::CreateLayer7Listener;

    fn columns() -> &'static [FieldSpec<Self>] {
        LISTENER_COLUMNS
    }

    fn state(&self) -> &RecordState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }

    fn lb_cloud_id(&self) -> &str {
        &self.cloud_clb_id
    }

    fn clb_vip_domain(&self) -> &str {
        &self.clb_vip_domain
    }

    fn set_lb_id(&mut self, lb_id: &str) {
        self.lb_id = Some(lb_id.to_string());
    }

    fn lb_id(&self) -> Option<&str> {
        self.lb_id.as_deref()
    }

    fn canonicalize(&mut self) {
        self.protocol = self.protocol.trim().to_uppercase();
        self.ssl_mode = self.ssl_mode.trim().to_uppercase();
    }

    fn dedup_key(&self) -> String {
        format!("{}-{}-{:?}", self.cloud_clb_id, self.protocol, self.listener_port)
    }

    fn check_local(&mut self) {
        let mut errs = Vec::new();
        if self.cloud_clb_id.is_empty() {
            errs.push("cloud_clb_id: obligatorio".to_string());
        }
        errs.extend(port_violations("listener_port", &self.listener_port, true));
        match self.protocol() {
            Some(Protocol::Http) => {
                if !self.ssl_mode.is_empty() || !self.cert_cloud_ids.is_empty() || !self.ca_cloud_id.is_empty() {
                    errs.push("HTTP no admite campos de certificado".to_string());
                }
            }
            Some(Protocol::Https) => {
                match self.ssl_mode.as_str() {
                    "" => errs.push("ssl_mode: obligatorio para HTTPS".to_string()),
                    SSL_MODE_UNIDIRECTIONAL => {}
                    SSL_MODE_MUTUAL => {
                        if self.ca_cloud_id.is_empty() {
                            errs.push("ca_cloud_id: obligatorio con ssl_mode MUTUAL".to_string());
                        }
                    }
                    other => errs.push(format!("ssl_mode: valor no soportado '{}'", other)),
                }
                if self.cert_cloud_ids.is_empty() {
                    errs.push("cert_cloud_ids: obligatorio para HTTPS".to_string());
                }
            }
            _ => errs.push(format!("protocol: '{}' no es un protocolo de capa 7", self.protocol)),
        }
        for e in errs {
            self.state.set_not_executable(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use import_domain::ImportStatus;

    fn https(ssl: &str, ca: &str, certs: &[&str]) -> Detail {
        Detail { cloud_clb_id: "lb-1".into(),
                 protocol: "HTTPS".into(),
                 listener_port: vec![443],
                 ssl_mode: ssl.into(),
                 ca_cloud_id: ca.into(),
                 cert_cloud_ids: certs.iter().map(|c| c.to_string()).collect(),
                 ..Default::default() }
    }

    #[test]
    fn https_certificate_rules() {
        let mut ok = https("UNIDIRECTIONAL", "", &["c1"]);
        ok.check_local();
        assert_eq!(ok.state.status, ImportStatus::Unvalidated);

        let mut mutual = https("MUTUAL", "", &["c1"]);
        mutual.check_local();
        assert_eq!(mutual.state.status, ImportStatus::NotExecutable);

        let mut missing = https("", "", &[]);
        missing.check_local();
        assert_eq!(missing.state.validate_result.len(), 2);
    }

    #[test]
    fn http_rejects_certificates_and_tcp_is_not_layer7() {
        let mut http = https("UNIDIRECTIONAL", "", &["c1"]);
        http.protocol = "HTTP".into();
        http.check_local();
        assert!(http.state.is_not_executable());

        let mut tcp = Detail { cloud_clb_id: "lb-1".into(),
                               protocol: "TCP".into(),
                               listener_port: vec![80],
                               ..Default::default() };
        tcp.check_local();
        assert!(tcp.state.is_not_executable());
    }
}
