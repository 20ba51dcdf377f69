use super::{Parameter, ParameterType, Parameterized};
use crate::error::Result;

/// A plain value wrapped as an object, so it can live in an object array
#[derive(Debug, Clone, Default)]
pub struct Serializable<T> {
    value: T,
    value_name: String,
}

impl<T> Serializable<T> {
    pub fn new(value: T, name: &str) -> Self {
        Serializable {
            value,
            value_name: name.to_string(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_name(&self) -> &str {
        &self.value_name
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Parameterized for Serializable<T>
where
    T: ParameterType + Default + Clone + Send + Sync,
{
    const NAME: &'static str = "Serializable";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![
            Parameter::new(
                "value",
                "Serialized value",
                |s: &Self| s.value.clone(),
                |s: &mut Self, v: T| s.value = v,
            ),
            Parameter::new(
                "value_name",
                "Name of the serialized value",
                |s: &Self| s.value_name.clone(),
                |s: &mut Self, v: String| s.value_name = v,
            )
            .not_available(),
        ]
    }

    fn new_instance(&self) -> Result<Self> {
        Ok(Serializable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ParameterValue, SgObject};
    use ndarray::array;

    #[test]
    fn wrapped_vector_is_a_registered_parameter() {
        let wrapped = Serializable::new(array![1.0f32, 2.0], "weights");

        assert_eq!(
            wrapped.get_parameter("value").unwrap(),
            ParameterValue::FloatVector(array![1.0, 2.0])
        );
        let cloned = wrapped.clone_object().unwrap();
        assert_eq!(
            cloned.get_parameter("value_name").unwrap(),
            ParameterValue::Text("weights".into())
        );
    }
}
