//! X.509 certificate secrets, self-signed with an RSA private key held
//! as another secret.

use std::sync::Arc;

use async_trait::async_trait;
use rand::{rngs::OsRng, RngCore};
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, KeyPair,
    KeyUsagePurpose, SerialNumber, PKCS_RSA_SHA256,
};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use sealbox_model::{Error, RequestContext, Result, SecretEntry, SECRET_TYPE_X509_CERTIFICATE};
use sealbox_vds::{codec, DataStore};
use sealbox_vks::VirtualKeyStore;
use serde::Deserialize;
use zeroize::Zeroizing;

use super::{discard_envelope, open_envelope, reject_existing, store_envelope, SecretType};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct X509CertificateMetaData {
    #[serde(default)]
    common_name: String,
    #[serde(default)]
    organization: String,
    #[serde(default)]
    organizational_unit: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    locality: String,
    #[serde(default)]
    private_key_id: String,
}

pub struct X509CertificateSecretType {
    data_store: Arc<dyn DataStore>,
    key_store: Arc<VirtualKeyStore>,
}

impl X509CertificateSecretType {
    pub fn new(data_store: Arc<dyn DataStore>, key_store: Arc<VirtualKeyStore>) -> Self {
        Self { data_store, key_store }
    }

    /// Load the referenced RSA private-key secret through the normal
    /// envelope read path.
    async fn subject_private_key_pem(&self, private_key_id: &str) -> Result<Zeroizing<String>> {
        let private_key_path = codec::secret_id_to_path(private_key_id);

        let data_store_entry = self.data_store.read(&private_key_path).await?;
        let secret_entry = codec::data_store_entry_to_secret_entry(&data_store_entry)?;

        let key = self.key_store.read(&private_key_path).await?;
        let pem_bytes = Zeroizing::new(
            sealbox_crypto::decrypt(&secret_entry.secret_data, &key)
                .map_err(|_| Error::Internal)?,
        );

        String::from_utf8(pem_bytes.to_vec())
            .map(Zeroizing::new)
            .map_err(|_| Error::Internal)
    }
}

#[async_trait]
impl SecretType for X509CertificateSecretType {
    fn type_name(&self) -> &'static str {
        SECRET_TYPE_X509_CERTIFICATE
    }

    async fn create_secret(&self, _ctx: &RequestContext, entry: &SecretEntry) -> Result<String> {
        let meta: X509CertificateMetaData =
            serde_json::from_str(&entry.meta_data).map_err(|_| Error::InputValidation)?;

        if meta.private_key_id.is_empty() {
            return Err(Error::InputValidation);
        }
        if meta.common_name.is_empty() || meta.organization.is_empty() {
            return Err(Error::InputValidation);
        }

        let secret_path = codec::secret_id_to_path(&entry.id);
        reject_existing(&self.data_store, &secret_path).await?;

        let signer_pem = self.subject_private_key_pem(&meta.private_key_id).await?;

        let cert_pem = tokio::task::spawn_blocking(move || generate_certificate(&meta, &signer_pem))
            .await
            .map_err(|_| Error::Internal)??;

        store_envelope(&self.data_store, &self.key_store, entry, cert_pem.as_bytes()).await?;

        Ok(entry.id.clone())
    }

    async fn get_secret(&self, _ctx: &RequestContext, entry: SecretEntry) -> Result<SecretEntry> {
        open_envelope(&self.key_store, entry).await
    }

    async fn delete_secret(&self, _ctx: &RequestContext, entry: &SecretEntry) -> Result<()> {
        discard_envelope(&self.data_store, &self.key_store, entry).await
    }
}

/// Build the self-signed certificate. Signing is CPU-bound, so the
/// caller runs this on a blocking thread.
fn generate_certificate(meta: &X509CertificateMetaData, signer_pem: &str) -> Result<String> {
    let private_key = RsaPrivateKey::from_pkcs1_pem(signer_pem).map_err(|_| Error::Internal)?;
    let pkcs8_pem = private_key.to_pkcs8_pem(LineEnding::LF).map_err(|_| Error::Internal)?;

    // The signer rejects RSA keys shorter than 2048 bits.
    let key_pair = KeyPair::from_pem_and_sign_algo(&pkcs8_pem, &PKCS_RSA_SHA256)
        .map_err(|_| Error::InputValidation)?;

    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, meta.common_name.as_str());
    distinguished_name.push(DnType::OrganizationName, meta.organization.as_str());
    distinguished_name.push(DnType::OrganizationalUnitName, meta.organizational_unit.as_str());
    distinguished_name.push(DnType::CountryName, meta.country.as_str());
    distinguished_name.push(DnType::LocalityName, meta.locality.as_str());

    let mut serial = vec![0u8; 16];
    OsRng.fill_bytes(&mut serial);

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name;
    params.serial_number = Some(SerialNumber::from(serial));
    params.not_before = time::OffsetDateTime::now_utc();
    params.not_after = params.not_before + time::Duration::days(365);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages =
        vec![ExtendedKeyUsagePurpose::ServerAuth, ExtendedKeyUsagePurpose::ClientAuth];

    let certificate = params.self_signed(&key_pair).map_err(|_| Error::Internal)?;

    Ok(certificate.pem())
}
