use super::{port_violations, ImportRecord};
use crate::normalizer::{parse_opt_i64, parse_ports, FieldSpec};
use import_domain::{Layer7ListenerBindRsDetail, RecordState, TaskOperation};

type Detail = Layer7ListenerBindRsDetail;
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
fn set_domain(d: &mut Detail, v: &str) -> SetResult {
    d.domain = v.to_string();
    Ok(())
}
fn set_url(d: &mut Detail, v: &str) -> SetResult {
    d.url_path = v.to_string();
    Ok(())
}
fn set_inst_type(d: &mut Detail, v: &str) -> SetResult {
    d.inst_type = v.to_uppercase();
    Ok(())
}
fn set_rs_ip(d: &mut Detail, v: &str) -> SetResult {
    d.rs_ip = v.to_string();
    Ok(())
}
fn set_rs_port(d: &mut Detail, v: &str) -> SetResult {
    d.rs_port = parse_ports(v)?;
    Ok(())
}
fn set_weight(d: &mut Detail, v: &str) -> SetResult {
    d.weight = parse_opt_i64(v)?;
    Ok(())
}
fn set_user_remark(d: &mut Detail, v: &str) -> SetResult {
    d.user_remark = v.to_string();
    Ok(())
}
fn set_rs_remark(d: &mut Detail, v: &str) -> SetResult {
    d.rs_remark = v.to_string();
    Ok(())
}

const BIND_RS_COLUMNS: &[FieldSpec<Detail>] = &[FieldSpec { name: "clb_vip_domain", set: set_vip },
                                                            FieldSpec { name: "cloud_clb_id", set: set_clb },
                                                            FieldSpec { name: "protocol", set: set_protocol },
                                                            FieldSpec { name: "listener_port", set: set_port },
                                                            FieldSpec { name: "domain", set: set_domain },
                                                            FieldSpec { name: "url_path", set: set_url },
                                                            FieldSpec { name: "inst_type", set: set_inst_type },
                                                            FieldSpec { name: "rs_ip", set: set_rs_ip },
                                                            FieldSpec { name: "rs_port", set: set_rs_port },
                                                            FieldSpec { name: "weight", set: set_weight },
                                                            FieldSpec { name: "user_remark", set: set_user_remark },
                                                            FieldSpec { name: "rs_remark", set: set_rs_remark }];

impl ImportRecord for Layer7ListenerBindRsDetail {
    const OPERATION: TaskOperation = TaskOperation::Layer7ListenerBindRs;

    fn columns() -> &'static [FieldSpec<Self>] {
        BIND_RS_COLUMNS
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
        self.inst_type = self.inst_type.trim().to_uppercase();
    }

    fn dedup_key(&self) -> String {
        format!("{}-{:?}-{}-{}-{}-{:?}",
                self.cloud_clb_id, self.listener_port, self.domain, self.url_path, self.rs_ip, self.rs_port)
    }

    fn check_local(&mut self) {
        let mut errs = Vec::new();
        if self.cloud_clb_id.is_empty() {
            errs.push("cloud_clb_id: obligatorio".to_string());
        }
        if !self.protocol().map(|p| p.is_layer7()).unwrap_or(false) {
            errs.push(format!("protocol: '{}' no es un protocolo de capa 7", self.protocol));
        }
        errs.extend(port_violations("listener_port", &self.listener_port, false));
        if self.domain.is_empty() {
            errs.push("domain: obligatorio".to_string());
        }
        if self.url_path.is_empty() {
            errs.push("url_path: obligatorio".to_string());
        }
        if self.inst_type().is_none() {
            errs.push(format!("inst_type: valor no soportado '{}'", self.inst_type));
        }
        if self.rs_ip.is_empty() {
            errs.push("rs_ip: obligatorio".to_string());
        }
        errs.extend(port_violations("rs_port", &self.rs_port, false));
        match self.weight {
            None => errs.push("weight: obligatorio".to_string()),
            Some(w) if !(0..=100).contains(&w) => errs.push(format!("weight: {} fuera del rango 0-100", w)),
            Some(_) => {}
        }
        for e in errs {
            self.state.set_not_executable(e);
        }
    }
}
