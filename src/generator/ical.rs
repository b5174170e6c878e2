use crate::{
    component::{Alarm, Incidence, serialize_component},
    generator::Emitter,
    parser::OpaqueComponent,
};

impl Emitter for OpaqueComponent {
    fn generate(&self) -> String {
        let compname = &self.name;
        let mut text = format!("BEGIN:{compname}\r\n");
        text += &self.properties.generate();
        text += &self.children.generate();
        text + "END:" + compname + "\r\n"
    }
}

impl Emitter for Incidence {
    fn generate(&self) -> String {
        serialize_component(self).generate()
    }
}

impl Emitter for Alarm {
    fn generate(&self) -> String {
        self.to_block().generate()
    }
}
